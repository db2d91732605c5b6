//! Network URL constants for the Cohortly SDK.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.cohortly.io";

/// Default fallback REST API base URL, tried once after a primary-host
/// network failure.
pub const DEFAULT_FALLBACK_API_URL: &str = "https://api-fallback.cohortly.io";

/// Default WebSocket URL for the collaboration relay.
pub const DEFAULT_WS_URL: &str = "wss://collab.cohortly.io/ws";

/// Default path prefix under which all REST endpoints live.
pub const DEFAULT_API_PREFIX: &str = "/api";
