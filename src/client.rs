//! High-level client — `CohortlyClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`. This
//! module keeps the builder, the shared response cache, and the accessors.
//! The client is an explicitly constructed value — build it once at the
//! application entry point and pass it down; nothing here is a process-wide
//! singleton.

use crate::auth::client::Auth;
use crate::auth::RefreshRoute;
use crate::cache::{CacheConfig, CacheDebug, ResponseCache};
use crate::domain::analytics::client::Analytics;
use crate::domain::participant::client::Participants;
use crate::domain::payment::client::Payments;
use crate::domain::study::client::Studies;
use crate::domain::template::client::Templates;
use crate::error::SdkError;
use crate::http::client::encode_query;
use crate::http::{CohortlyHttp, HttpConfig, RecoveryPolicy};
use crate::notify::{Notifier, NoopNotifier, SharedNotifier};
use crate::session::{MemorySessionStore, SessionStore};
use crate::ws::WsConfig;

use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// The primary entry point for the Cohortly SDK.
///
/// Provides nested sub-client accessors for each domain:
/// `client.studies()`, `client.participants()`, etc.
pub struct CohortlyClient {
    pub(crate) http: CohortlyHttp,
    pub(crate) cache: Arc<ResponseCache>,
    pub(crate) ws_config: WsConfig,
}

impl CohortlyClient {
    pub fn builder() -> CohortlyClientBuilder {
        CohortlyClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    pub fn studies(&self) -> Studies<'_> {
        Studies { client: self }
    }

    pub fn templates(&self) -> Templates<'_> {
        Templates { client: self }
    }

    pub fn participants(&self) -> Participants<'_> {
        Participants { client: self }
    }

    pub fn payments(&self) -> Payments<'_> {
        Payments { client: self }
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics { client: self }
    }

    /// The low-level HTTP client, for endpoints without a typed wrapper yet.
    pub fn http(&self) -> &CohortlyHttp {
        &self.http
    }

    // ── Cached GET surface ───────────────────────────────────────────────

    /// GET through the response cache: a hit within TTL skips the network
    /// entirely; a miss (or expired entry) dispatches and stores the result
    /// keyed by `(path, params)`.
    pub async fn get_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SdkError> {
        let key = encode_query(path, params);

        if let Some(value) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(serde_json::from_value(value)?);
        }

        let value = self
            .http
            .request_value(Method::GET, &key, None::<&()>, RecoveryPolicy::standard())
            .await?;
        self.cache.put(key, value.clone()).await;
        Ok(serde_json::from_value(value)?)
    }

    /// Drop every cache entry whose key contains `pattern`. Returns the
    /// number removed.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern).await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Read-only cache introspection, for operational visibility.
    pub async fn cache_debug(&self) -> CacheDebug {
        self.cache.debug_snapshot().await
    }

    // ── Collaboration relay ──────────────────────────────────────────────

    /// WS config for creating a collaboration connection.
    ///
    /// The WS client is intentionally not embedded in `CohortlyClient`:
    /// connection lifetimes belong to the application layer (typically a
    /// study editor's open/close).
    pub fn ws_config(&self) -> WsConfig {
        let mut config = self.ws_config.clone();
        config.token = self.http.session().map(|s| s.access_token);
        config
    }

    /// Create a collaboration WS client carrying the current session token.
    #[cfg(feature = "ws-native")]
    pub fn collab(&self) -> crate::ws::native::WsClient {
        crate::ws::native::WsClient::new(self.ws_config())
    }
}

impl Clone for CohortlyClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            cache: self.cache.clone(),
            ws_config: self.ws_config.clone(),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct CohortlyClientBuilder {
    http: HttpConfig,
    ws_url: String,
    cache: CacheConfig,
    store: Option<Arc<dyn SessionStore>>,
    notifier: Option<SharedNotifier>,
}

impl Default for CohortlyClientBuilder {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            ws_url: crate::network::DEFAULT_WS_URL.to_string(),
            cache: CacheConfig::default(),
            store: None,
            notifier: None,
        }
    }
}

impl CohortlyClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.http.base_url = url.to_string();
        self
    }

    pub fn fallback_url(mut self, url: &str) -> Self {
        self.http.fallback_url = Some(url.to_string());
        self
    }

    /// Disable the fallback hop entirely.
    pub fn no_fallback(mut self) -> Self {
        self.http.fallback_url = None;
        self
    }

    pub fn api_prefix(mut self, prefix: &str) -> Self {
        self.http.api_prefix = prefix.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    pub fn refresh_route(mut self, route: RefreshRoute) -> Self {
        self.http.refresh_route = route;
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_url = url.to_string();
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Inject the session persistence capability. Defaults to an in-memory
    /// store scoped to this client.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Inject the user-notification capability. Defaults to a no-op sink.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> Result<CohortlyClient, SdkError> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier));

        Ok(CohortlyClient {
            http: CohortlyHttp::new(self.http, store, notifier),
            cache: Arc::new(ResponseCache::new(self.cache)),
            ws_config: WsConfig {
                url: self.ws_url,
                ..WsConfig::default()
            },
        })
    }
}
