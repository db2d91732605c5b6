//! # Cohortly SDK
//!
//! The client-side service layer for the Cohortly research platform: study
//! creation, participant recruitment, payments, analytics, and real-time
//! collaboration.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — errors, network constants, session state, notification capability
//! 2. **HTTP** — `CohortlyHttp`: bearer injection, one-shot token refresh on
//!    401, one-shot fallback-host hop on network failure
//! 3. **Cache** — TTL response cache backing the cached-GET surface
//! 4. **Domains** — thin typed sub-clients (studies, templates, participants,
//!    payments, analytics)
//! 5. **Collaboration** — WebSocket relay client (`ws-native` feature)
//! 6. **High-Level Client** — `CohortlyClient` with builder and accessors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cohortly_sdk::prelude::*;
//!
//! let client = CohortlyClient::builder()
//!     .base_url("https://api.cohortly.io")
//!     .build()?;
//!
//! client.auth().login("researcher@lab.example", "hunter2").await?;
//! let studies = client.studies().list(None, None).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

/// User-notification capability.
pub mod notify;

/// Session state and persistence capability.
pub mod session;

/// Authentication: wire types, refresh shapes, login/logout.
pub mod auth;

// ── Layer 2: HTTP ────────────────────────────────────────────────────────────

/// HTTP client with bounded per-call recovery.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 3: Cache ───────────────────────────────────────────────────────────

/// TTL response cache for GET endpoints.
#[cfg(feature = "http")]
pub mod cache;

// ── Layer 4: Domains ─────────────────────────────────────────────────────────

/// Domain modules (vertical slices): types and sub-clients.
pub mod domain;

// ── Layer 5: Collaboration ───────────────────────────────────────────────────

/// Collaboration relay: messages, subscriptions, events.
pub mod ws;

// ── Layer 6: High-Level Client ───────────────────────────────────────────────

/// `CohortlyClient` — the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Errors
    pub use crate::error::{AuthError, HttpError, SdkError, WsError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_FALLBACK_API_URL, DEFAULT_WS_URL};

    // Session + notification capabilities
    pub use crate::notify::{NoopNotifier, Notifier};
    pub use crate::session::{FileSessionStore, MemorySessionStore, Session, SessionStore};

    // Auth types
    pub use crate::auth::{RefreshRoute, UserProfile};

    // Domain types
    pub use crate::domain::analytics::{ResponsePoint, ResponseSeries, StudySummary};
    pub use crate::domain::participant::{
        InviteRequest, Participant, ParticipantStatus, ParticipantsResponse,
    };
    pub use crate::domain::payment::{
        Balance, Payout, PayoutStatus, Transaction, TransactionKind, TransactionsResponse,
    };
    pub use crate::domain::study::{
        CreateStudyRequest, StudiesResponse, Study, StudyStatus, UpdateStudyRequest,
    };
    pub use crate::domain::template::{Template, TemplatesResponse};

    // HTTP client + high-level client
    #[cfg(feature = "http")]
    pub use crate::cache::{CacheConfig, CacheDebug, CacheRule};
    #[cfg(feature = "http")]
    pub use crate::client::{CohortlyClient, CohortlyClientBuilder};
    #[cfg(feature = "http")]
    pub use crate::http::{CohortlyHttp, HttpConfig, RecoveryPolicy};

    // WebSocket types
    pub use crate::ws::{Kind, MessageOut, SubscribeParams, UnsubscribeParams, WsConfig, WsEvent};
}
