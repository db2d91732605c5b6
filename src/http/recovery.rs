//! Per-call recovery policies.
//!
//! Token refresh and fallback-host routing are orthogonal toggles, composed
//! per call. Recovery is bounded: at most one refresh-and-retry on 401 and at
//! most one fallback hop on a network-class failure — never a retry loop.

use std::time::Duration;

/// How far ahead of expiry the client refreshes before dispatching.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Per-request deadline. A request that exceeds it fails as `NetworkError`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the client routes straight to the fallback host after a
/// transport-level primary failure, before probing the primary again.
pub const PRIMARY_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Recovery policy for an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// On 401: exchange the refresh token and re-dispatch once.
    pub refresh_on_unauthorized: bool,
    /// On connect/DNS/timeout/5xx: re-dispatch once against the fallback
    /// host, when one is configured.
    pub fallback_on_network: bool,
}

impl RecoveryPolicy {
    /// The default for every endpoint: both recoveries enabled.
    pub fn standard() -> Self {
        Self {
            refresh_on_unauthorized: true,
            fallback_on_network: true,
        }
    }

    /// Refresh-only. Pins the call to the host it started on.
    pub fn pinned() -> Self {
        Self {
            refresh_on_unauthorized: true,
            fallback_on_network: false,
        }
    }

    /// No recovery at all. Used by calls that are themselves part of the
    /// recovery machinery.
    pub fn none() -> Self {
        Self {
            refresh_on_unauthorized: false,
            fallback_on_network: false,
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standard() {
        let policy = RecoveryPolicy::default();
        assert!(policy.refresh_on_unauthorized);
        assert!(policy.fallback_on_network);
    }

    #[test]
    fn test_none_disables_both() {
        let policy = RecoveryPolicy::none();
        assert!(!policy.refresh_on_unauthorized);
        assert!(!policy.fallback_on_network);
    }

    #[test]
    fn test_pinned_keeps_refresh() {
        let policy = RecoveryPolicy::pinned();
        assert!(policy.refresh_on_unauthorized);
        assert!(!policy.fallback_on_network);
    }
}
