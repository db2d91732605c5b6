//! Session state and the injected persistence capability.
//!
//! ## Security Model
//!
//! - The SDK never owns where credentials live: callers inject a
//!   [`SessionStore`] (browser local storage, OS keychain, a file, memory).
//! - The store holds the bearer token, the refresh token, and optionally an
//!   explicit expiry. When no expiry is stored, the access token's JWT `exp`
//!   claim is consulted instead.
//! - Tokens beginning with `offline-` are local placeholder credentials used
//!   by the offline demo mode. A failed refresh never clears such a session
//!   and never triggers the re-login signal.

pub mod jwt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix marking a local/offline placeholder token.
pub const OFFLINE_TOKEN_PREFIX: &str = "offline-";

/// The persisted auth session.
///
/// Created on login, replaced on every successful refresh, cleared on
/// unrecoverable auth failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Explicit expiry, when the backend provided one. `None` means the
    /// access token's own `exp` claim governs.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Effective expiry: the stored value, else the JWT `exp` claim.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at.or_else(|| jwt::expiry(&self.access_token))
    }

    /// Whether the token expires within `margin` from now (or already has).
    /// Tokens with no discoverable expiry are treated as non-expiring.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expiry() {
            Some(at) => at <= Utc::now() + chrono::Duration::seconds(margin.as_secs() as i64),
            None => false,
        }
    }

    /// Whether this is a local/offline placeholder session.
    pub fn is_offline(&self) -> bool {
        self.access_token.starts_with(OFFLINE_TOKEN_PREFIX)
    }
}

/// Injected persistence capability for the auth session.
///
/// Implementations must be cheap to call: the client consults the store on
/// every dispatch. `set` and `clear` failures are the implementation's to
/// log; the client treats both as fire-and-forget.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Session>;
    fn set(&self, session: Session);
    fn clear(&self);
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// Process-local session store. The default when none is injected.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: std::sync::Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: std::sync::Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.slot.lock().ok().and_then(|g| g.clone())
    }

    fn set(&self, session: Session) {
        if let Ok(mut g) = self.slot.lock() {
            *g = Some(session);
        }
    }

    fn clear(&self) {
        if let Ok(mut g) = self.slot.lock() {
            *g = None;
        }
    }
}

// ─── File-backed store ───────────────────────────────────────────────────────

/// On-disk envelope, compatible with the web client's `auth-storage` slot:
/// `{ "state": { "token": ..., "refreshToken": ... }, "version": 0 }`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredAuth {
    state: StoredAuthState,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredAuthState {
    token: String,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// JSON-file session store for native CLIs and long-running tools.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Session> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let stored: StoredAuth = serde_json::from_str(&raw).ok()?;
        Some(Session {
            access_token: stored.state.token,
            refresh_token: stored.state.refresh_token,
            expires_at: None,
        })
    }

    fn set(&self, session: Session) {
        let stored = StoredAuth {
            state: StoredAuthState {
                token: session.access_token,
                refresh_token: session.refresh_token,
            },
            version: 0,
        };
        match serde_json::to_string_pretty(&stored) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::warn!("Failed to persist session to {:?}: {}", self.path, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize session: {}", e),
        }
    }

    fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to clear session file {:?}: {}", self.path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.get().is_none());

        store.set(Session::new("tok").with_refresh_token("refresh"));
        let loaded = store.get().unwrap();
        assert_eq!(loaded.access_token, "tok");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_file_store_roundtrip_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth-storage.json");
        let store = FileSessionStore::new(&path);

        store.set(Session::new("tok").with_refresh_token("refresh"));

        // The on-disk shape matches the web client's auth-storage slot.
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["state"]["token"], "tok");
        assert_eq!(parsed["state"]["refreshToken"], "refresh");
        assert_eq!(parsed["version"], 0);

        let loaded = store.get().unwrap();
        assert_eq!(loaded.access_token, "tok");

        store.clear();
        assert!(store.get().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_expires_within_explicit_expiry() {
        let soon = Session::new("tok")
            .with_expires_at(Utc::now() + chrono::Duration::seconds(120));
        assert!(soon.expires_within(Duration::from_secs(300)));
        assert!(!soon.expires_within(Duration::from_secs(60)));

        let later = Session::new("tok")
            .with_expires_at(Utc::now() + chrono::Duration::seconds(3600));
        assert!(!later.expires_within(Duration::from_secs(300)));
    }

    #[test]
    fn test_no_expiry_means_non_expiring() {
        let session = Session::new("opaque-token");
        assert!(session.expiry().is_none());
        assert!(!session.expires_within(Duration::from_secs(300)));
    }

    #[test]
    fn test_offline_token_detection() {
        assert!(Session::new("offline-demo").is_offline());
        assert!(!Session::new("eyJhbGciOi").is_offline());
    }
}
