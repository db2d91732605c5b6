//! Authentication — session wire types, refresh exchange shapes, login/logout.
//!
//! ## Token lifecycle
//!
//! - Login stores a [`crate::session::Session`] in the injected store.
//! - Every dispatch injects `Authorization: Bearer <token>` from that store.
//! - The HTTP layer refreshes the token ahead of expiry (5-minute margin)
//!   and once more reactively on a 401; see `http::client`.
//! - Logout clears the server-side session, then the store.

#[cfg(feature = "http")]
pub mod client;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// User profile types
// ============================================================================

/// A platform user, as returned by login and `GET /api/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// `researcher`, `participant`, or `admin`.
    pub role: Option<String>,
    pub organization_id: Option<String>,
}

/// Response from `GET /api/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: UserProfile,
    pub expires_at: Option<i64>,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ============================================================================
// Refresh exchange
// ============================================================================

/// Where the token-refresh endpoint lives. Older deployments route auth
/// actions through a query parameter on the collection endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshRoute {
    /// `POST {base}{prefix}/auth/refresh`
    #[default]
    Path,
    /// `POST {base}{prefix}/auth?action=refresh`
    ActionParam,
}

impl RefreshRoute {
    pub fn url(&self, base: &str, prefix: &str) -> String {
        match self {
            RefreshRoute::Path => format!("{}{}/auth/refresh", base, prefix),
            RefreshRoute::ActionParam => format!("{}{}/auth?action=refresh", base, prefix),
        }
    }
}

/// Tokens extracted from a refresh (or login) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Extract tokens from a refresh response.
///
/// Compatibility shim, not business logic: three response shapes have shipped
/// over the backend's lifetime and all remain in the wild. Tried in order:
///
/// 1. `{"session": {"access_token", "refresh_token", "expires_at"}}` (current)
/// 2. `{"data": {"accessToken", "refreshToken", "expiresAt"}}`
/// 3. `{"token", "refreshToken", "expiresAt"}` (original)
pub fn parse_refresh_response(payload: &Value) -> Option<RefreshedSession> {
    if let Some(session) = payload.get("session") {
        if let Some(token) = session.get("access_token").and_then(Value::as_str) {
            return Some(RefreshedSession {
                access_token: token.to_string(),
                refresh_token: str_field(session, "refresh_token"),
                expires_at: epoch_field(session, "expires_at"),
            });
        }
    }

    if let Some(data) = payload.get("data") {
        if let Some(token) = data.get("accessToken").and_then(Value::as_str) {
            return Some(RefreshedSession {
                access_token: token.to_string(),
                refresh_token: str_field(data, "refreshToken"),
                expires_at: epoch_field(data, "expiresAt"),
            });
        }
    }

    payload
        .get("token")
        .and_then(Value::as_str)
        .map(|token| RefreshedSession {
            access_token: token.to_string(),
            refresh_token: str_field(payload, "refreshToken"),
            expires_at: epoch_field(payload, "expiresAt"),
        })
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(String::from)
}

fn epoch_field(v: &Value, key: &str) -> Option<DateTime<Utc>> {
    v.get(key)
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_current_session_shape() {
        let payload = json!({
            "session": {
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "expires_at": 2_000_000_000,
            },
            "user": {"id": "u1", "email": "a@b.c"},
        });
        let parsed = parse_refresh_response(&payload).unwrap();
        assert_eq!(parsed.access_token, "at-1");
        assert_eq!(parsed.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(parsed.expires_at.unwrap().timestamp(), 2_000_000_000);
    }

    #[test]
    fn test_parse_data_envelope_shape() {
        let payload = json!({"data": {"accessToken": "at-2", "refreshToken": "rt-2"}});
        let parsed = parse_refresh_response(&payload).unwrap();
        assert_eq!(parsed.access_token, "at-2");
        assert_eq!(parsed.refresh_token.as_deref(), Some("rt-2"));
        assert!(parsed.expires_at.is_none());
    }

    #[test]
    fn test_parse_bare_token_shape() {
        let payload = json!({"token": "at-3", "expiresAt": 2_000_000_000});
        let parsed = parse_refresh_response(&payload).unwrap();
        assert_eq!(parsed.access_token, "at-3");
        assert!(parsed.refresh_token.is_none());
        assert_eq!(parsed.expires_at.unwrap().timestamp(), 2_000_000_000);
    }

    #[test]
    fn test_shapes_tried_in_order() {
        // A response carrying both shapes resolves to the newest one.
        let payload = json!({
            "session": {"access_token": "new"},
            "token": "legacy",
        });
        let parsed = parse_refresh_response(&payload).unwrap();
        assert_eq!(parsed.access_token, "new");
    }

    #[test]
    fn test_unrecognized_shape_is_none() {
        assert!(parse_refresh_response(&json!({"ok": true})).is_none());
        assert!(parse_refresh_response(&json!({"session": {}})).is_none());
    }

    #[test]
    fn test_refresh_route_urls() {
        assert_eq!(
            RefreshRoute::Path.url("https://api.example.com", "/api"),
            "https://api.example.com/api/auth/refresh"
        );
        assert_eq!(
            RefreshRoute::ActionParam.url("https://api.example.com", "/api"),
            "https://api.example.com/api/auth?action=refresh"
        );
    }
}
