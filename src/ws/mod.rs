//! Collaboration relay — messages, subscriptions, events.
//!
//! The relay fans study-level events (presence, comments, study updates) out
//! to every connected editor. This module defines the shared message/event
//! types; the transport lives in `native.rs` behind the `ws-native` feature.

pub mod subscriptions;

#[cfg(feature = "ws-native")]
pub mod native;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use subscriptions::{SubscribeParams, UnsubscribeParams};

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to relay.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOut {
    Subscribe { params: SubscribeParams },
    Unsubscribe { params: UnsubscribeParams },
    Ping,
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// Raw inbound message from the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageIn {
    #[serde(flatten)]
    pub kind: Kind,
}

/// The type of inbound relay message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kind {
    Presence(PresencePayload),
    Comment(CommentPayload),
    StudyUpdate(StudyUpdatePayload),
    Pong,
    Error(WsErrorPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresencePayload {
    pub data: PresenceEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentPayload {
    pub data: CommentEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudyUpdatePayload {
    pub data: StudyUpdateEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsErrorPayload {
    pub message: String,
    pub code: Option<String>,
}

/// A collaborator joined, left, or touched a study.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceEvent {
    pub study_id: String,
    pub user_id: String,
    pub state: PresenceState,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Joined,
    Active,
    Left,
}

/// A comment posted on a study.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentEvent {
    pub id: String,
    pub study_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Another editor saved the study; `revision` is monotonic per study.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyUpdateEvent {
    pub study_id: String,
    pub revision: u64,
    pub changed_by: String,
}

// ─── WsEvent ─────────────────────────────────────────────────────────────────

/// High-level events emitted by the WS client to the consumer.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// A parsed message from the relay.
    Message(Kind),
    /// Connection established (or re-established).
    Connected,
    /// Connection lost (may trigger reconnect).
    Disconnected { code: Option<u16>, reason: String },
    /// A deserialization or protocol error.
    Error(String),
    /// Reconnect attempts exhausted; the client stays down.
    ReconnectGaveUp,
}

/// Configuration for the WS client.
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    /// Bearer token appended as a query parameter on connect. Populated by
    /// `CohortlyClient::ws_config()` from the current session.
    pub token: Option<String>,
    pub reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub base_reconnect_delay_ms: u32,
    pub ping_interval_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            token: None,
            reconnect: true,
            max_reconnect_attempts: 10,
            base_reconnect_delay_ms: 1000,
            ping_interval_ms: 30_000,
        }
    }
}

impl WsConfig {
    /// The URL to dial, with the token attached when present.
    pub fn connect_url(&self) -> String {
        match &self.token {
            Some(token) => format!("{}?token={}", self.url, urlencoding::encode(token)),
            None => self.url.clone(),
        }
    }
}
