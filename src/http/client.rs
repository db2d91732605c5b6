//! Low-level HTTP client — `CohortlyHttp`.
//!
//! Owns request dispatch and recovery. Every call runs the same sequence:
//!
//! 1. If the stored token expires within the refresh margin and a refresh
//!    token is present, refresh ahead of dispatch (failure is tolerated —
//!    the reactive path below still applies).
//! 2. Attach `Authorization: Bearer <token>` when a session exists; dispatch.
//! 3. On 401, exchange the refresh token and re-dispatch **exactly once**.
//!    A second 401, or a failed exchange, is terminal: the session is
//!    cleared (offline placeholder sessions excepted) and `Unauthorized`
//!    surfaces.
//! 4. On a network-class failure (connect/DNS/timeout/5xx), re-dispatch
//!    **exactly once** against the fallback host, when configured.
//! 5. Everything else maps onto the error taxonomy without retry.
//!
//! Refresh exchanges are single-flight: concurrent callers that saw the same
//! token fail share one exchange.

use crate::auth::{parse_refresh_response, RefreshRoute};
use crate::error::HttpError;
use crate::http::recovery::{
    RecoveryPolicy, DEFAULT_REQUEST_TIMEOUT, PRIMARY_PROBE_INTERVAL, REFRESH_MARGIN,
};
use crate::network;
use crate::notify::SharedNotifier;
use crate::session::{Session, SessionStore};

use async_lock::{Mutex, RwLock};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Transport configuration for [`CohortlyHttp`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    /// Secondary host tried once after a primary network failure.
    pub fallback_url: Option<String>,
    /// Path prefix under which all endpoints live.
    pub api_prefix: String,
    pub timeout: Duration,
    pub refresh_route: RefreshRoute,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_API_URL.to_string(),
            fallback_url: Some(network::DEFAULT_FALLBACK_API_URL.to_string()),
            api_prefix: network::DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_route: RefreshRoute::default(),
        }
    }
}

/// Low-level HTTP client for the Cohortly REST API.
pub struct CohortlyHttp {
    base_url: String,
    fallback_url: Option<String>,
    api_prefix: String,
    refresh_route: RefreshRoute,
    client: Client,
    store: Arc<dyn SessionStore>,
    notifier: SharedNotifier,
    /// Serializes refresh exchanges (single-flight).
    refresh_gate: Arc<Mutex<()>>,
    /// When the primary host last failed at the transport level. While
    /// recent, dispatch starts on the fallback host directly.
    primary_down_since: Arc<RwLock<Option<Instant>>>,
}

impl CohortlyHttp {
    pub fn new(config: HttpConfig, store: Arc<dyn SessionStore>, notifier: SharedNotifier) -> Self {
        let mut builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder
                .timeout(config.timeout)
                .pool_max_idle_per_host(10);
        }

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fallback_url: config
                .fallback_url
                .map(|u| u.trim_end_matches('/').to_string()),
            api_prefix: config.api_prefix,
            refresh_route: config.refresh_route,
            client: builder.build().expect("Failed to build HTTP client"),
            store,
            notifier,
            refresh_gate: Arc::new(Mutex::new(())),
            primary_down_since: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_url(&self) -> Option<&str> {
        self.fallback_url.as_deref()
    }

    // ── Session plumbing (used by the auth sub-client) ───────────────────

    pub(crate) fn session(&self) -> Option<Session> {
        self.store.get()
    }

    pub(crate) fn store_session(&self, session: Session) {
        self.store.set(session);
    }

    pub(crate) fn clear_session(&self) {
        self.store.clear();
    }

    // ── Typed convenience methods ────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(Method::GET, path, None::<&()>, RecoveryPolicy::standard())
            .await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        self.get(&encode_query(path, params)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::POST, path, Some(body), RecoveryPolicy::standard())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::PUT, path, Some(body), RecoveryPolicy::standard())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::PATCH, path, Some(body), RecoveryPolicy::standard())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(Method::DELETE, path, None::<&()>, RecoveryPolicy::standard())
            .await
    }

    /// Typed request with an explicit recovery policy.
    pub async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        policy: RecoveryPolicy,
    ) -> Result<T, HttpError> {
        let value = self.request_value(method, path, body, policy).await?;
        serde_json::from_value(value).map_err(|e| HttpError::Decode(e.to_string()))
    }

    // ── Dispatch with recovery ───────────────────────────────────────────

    /// Perform a request, returning the decoded JSON body.
    ///
    /// This is the recovery loop described in the module docs. The cached-GET
    /// path uses it directly so the cache can hold untyped bodies.
    pub async fn request_value<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        policy: RecoveryPolicy,
    ) -> Result<Value, HttpError> {
        if policy.refresh_on_unauthorized {
            self.refresh_ahead().await;
        }

        let (mut base, mut on_fallback) = self.starting_base().await;
        let mut refreshed = false;

        loop {
            let token = self.session().map(|s| s.access_token);
            let result = self
                .dispatch(&method, &base, path, body, token.as_deref())
                .await;

            match result {
                Ok(value) => {
                    if !on_fallback {
                        self.mark_primary_up().await;
                    }
                    return Ok(value);
                }

                Err(HttpError::Unauthorized) if policy.refresh_on_unauthorized && !refreshed => {
                    refreshed = true;
                    match self.refresh_session(token.as_deref()).await {
                        Ok(_) => {
                            tracing::debug!("Retrying {} {} with refreshed token", method, path);
                            continue;
                        }
                        Err(e) => {
                            tracing::debug!("Token refresh failed: {}", e);
                            self.expire_session();
                            return Err(HttpError::Unauthorized);
                        }
                    }
                }

                Err(e) if e.is_network_class() && policy.fallback_on_network && !on_fallback => {
                    let Some(fallback) = self.fallback_url.clone() else {
                        self.notifier.error(&e.to_string());
                        return Err(e);
                    };
                    if matches!(e, HttpError::NetworkError(_)) {
                        self.mark_primary_down().await;
                    }
                    tracing::warn!(
                        "Primary host failed for {} {} ({}), retrying via fallback",
                        method,
                        path,
                        e
                    );
                    base = fallback;
                    on_fallback = true;
                    continue;
                }

                Err(e) => {
                    match &e {
                        // Calls that opted out of refresh (login itself) must
                        // not tear down an existing session on their 401s.
                        HttpError::Unauthorized => {
                            if policy.refresh_on_unauthorized {
                                self.expire_session();
                            }
                        }
                        other => self.notifier.error(&other.to_string()),
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn dispatch<B: Serialize>(
        &self,
        method: &Method,
        base: &str,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<Value, HttpError> {
        let url = format!("{}{}{}", base, self.api_prefix, path);
        let mut req = self.client.request(method.clone(), &url);

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(HttpError::from)?;
        let status = resp.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            let raw = resp.text().await.map_err(HttpError::from)?;
            if raw.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&raw).map_err(|e| HttpError::Decode(e.to_string()));
        }

        let code = status.as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = server_message(&text);

        Err(match code {
            401 => HttpError::Unauthorized,
            403 => HttpError::Forbidden(message),
            500..=599 => HttpError::ServerError {
                status: code,
                message,
            },
            _ => HttpError::Other {
                status: Some(code),
                message,
            },
        })
    }

    // ── Token refresh ────────────────────────────────────────────────────

    /// Refresh ahead of dispatch when the token is near expiry. Failure is
    /// tolerated: the stale token goes out and the 401 path recovers.
    async fn refresh_ahead(&self) {
        let Some(session) = self.session() else {
            return;
        };
        if session.refresh_token.is_none() || !session.expires_within(REFRESH_MARGIN) {
            return;
        }
        if let Err(e) = self.refresh_session(Some(&session.access_token)).await {
            tracing::debug!("Ahead-of-expiry refresh failed, dispatching anyway: {}", e);
        }
    }

    /// Exchange the refresh token for a new session and persist it.
    ///
    /// Single-flight: `stale_token` is the access token the caller saw fail
    /// (or hold). If another caller already replaced it by the time the gate
    /// is acquired, the exchange is skipped and the fresh session returned.
    pub(crate) async fn refresh_session(
        &self,
        stale_token: Option<&str>,
    ) -> Result<Session, HttpError> {
        let _gate = self.refresh_gate.lock().await;

        let session = self.session().ok_or(HttpError::Unauthorized)?;
        if let Some(stale) = stale_token {
            if session.access_token != stale {
                tracing::debug!("Token already refreshed by a concurrent caller");
                return Ok(session);
            }
        }
        let refresh_token = session.refresh_token.clone().ok_or(HttpError::Unauthorized)?;

        let (base, _) = self.starting_base().await;
        let url = self.refresh_route.url(&base, &self.api_prefix);
        let body = serde_json::json!({ "refreshToken": refresh_token });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(HttpError::from)?;
        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => HttpError::Unauthorized,
                code => HttpError::Other {
                    status: Some(code),
                    message: server_message(&text),
                },
            });
        }

        let payload: Value = resp.json().await.map_err(HttpError::from)?;
        let refreshed = parse_refresh_response(&payload).ok_or_else(|| {
            HttpError::Decode("Refresh response carried no recognizable access token".into())
        })?;

        let next = Session {
            expires_at: refreshed
                .expires_at
                .or_else(|| crate::session::jwt::expiry(&refreshed.access_token)),
            access_token: refreshed.access_token,
            // A rotated refresh token replaces ours; otherwise keep it.
            refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
        };
        self.store.set(next.clone());
        tracing::debug!("Access token refreshed");
        Ok(next)
    }

    /// Terminal auth failure: drop the session and signal re-login, except
    /// for offline placeholder sessions which stay usable without a backend.
    fn expire_session(&self) {
        if let Some(session) = self.session() {
            if session.is_offline() {
                tracing::debug!("Keeping offline placeholder session after auth failure");
                return;
            }
        }
        self.store.clear();
        self.notifier.auth_required();
    }

    // ── Connectivity state ───────────────────────────────────────────────

    /// Which host to start on: the fallback while the primary recently
    /// failed at the transport level, the primary otherwise (including as a
    /// probe once the window lapses).
    async fn starting_base(&self) -> (String, bool) {
        if let Some(fallback) = &self.fallback_url {
            let down_since = *self.primary_down_since.read().await;
            if let Some(at) = down_since {
                if at.elapsed() < PRIMARY_PROBE_INTERVAL {
                    return (fallback.clone(), true);
                }
            }
        }
        (self.base_url.clone(), false)
    }

    async fn mark_primary_down(&self) {
        *self.primary_down_since.write().await = Some(Instant::now());
    }

    async fn mark_primary_up(&self) {
        if self.primary_down_since.read().await.is_none() {
            return;
        }
        tracing::debug!("Primary host reachable again");
        *self.primary_down_since.write().await = None;
    }
}

impl Clone for CohortlyHttp {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            fallback_url: self.fallback_url.clone(),
            api_prefix: self.api_prefix.clone(),
            refresh_route: self.refresh_route,
            client: self.client.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            refresh_gate: self.refresh_gate.clone(),
            primary_down_since: self.primary_down_since.clone(),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Append URL-encoded query parameters to a path. Also the canonical cache
/// key for a `(path, params)` pair.
pub(crate) fn encode_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", path, query)
}

/// Pull a human-readable message out of an error body. The backend sends
/// `{"message": ...}` normally and `{"error": ...}` from older handlers.
fn server_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(s) = v.get(key).and_then(Value::as_str) {
                return s.to_string();
            }
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_query_empty() {
        assert_eq!(encode_query("/studies", &[]), "/studies");
    }

    #[test]
    fn test_encode_query_encodes_values() {
        let key = encode_query("/studies", &[("q", "eye tracking"), ("limit", "20")]);
        assert_eq!(key, "/studies?q=eye%20tracking&limit=20");
    }

    #[test]
    fn test_server_message_prefers_message_field() {
        assert_eq!(
            server_message(r#"{"message": "study not found"}"#),
            "study not found"
        );
        assert_eq!(server_message(r#"{"error": "nope"}"#), "nope");
    }

    #[test]
    fn test_server_message_falls_back_to_raw_body() {
        assert_eq!(server_message("plain text failure"), "plain text failure");
        assert_eq!(server_message(r#"{"code": 7}"#), r#"{"code": 7}"#);
    }
}
