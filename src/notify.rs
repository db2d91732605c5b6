//! User-notification capability.
//!
//! The client emits at most one notification per failed call, and only for
//! unrecoverable non-auth errors. Terminal auth failures instead emit the
//! `auth_required` signal, which a host application typically maps to its
//! re-login flow. Injected so the core stays free of UI coupling.

use std::sync::Arc;

/// Injected notification sink. All methods are fire-and-forget.
pub trait Notifier: Send + Sync {
    /// An unrecoverable, non-auth error the user should hear about.
    fn error(&self, message: &str);

    /// The session is gone and cannot be recovered — the host should route
    /// the user back to login.
    fn auth_required(&self);
}

/// The default sink: logs and otherwise stays quiet.
#[derive(Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn error(&self, message: &str) {
        tracing::debug!("Suppressed user notification: {}", message);
    }

    fn auth_required(&self) {
        tracing::debug!("Suppressed auth-required signal");
    }
}

/// Shared handle type used throughout the client.
pub type SharedNotifier = Arc<dyn Notifier>;
