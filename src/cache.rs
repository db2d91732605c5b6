//! TTL response cache for GET endpoints.
//!
//! Keyed by `(path, encoded params)`. Per-prefix TTL and size rules with a
//! default, insertion-order (oldest-first) eviction, and an amortized sweep:
//! eviction runs probabilistically on writes, so the store may exceed its
//! capacity by a small margin between sweeps. Expired entries are never
//! served — a read past expiry deletes the entry and misses.

use async_lock::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// TTL/size override for one endpoint prefix.
#[derive(Debug, Clone)]
pub struct CacheRule {
    pub prefix: String,
    pub ttl: Duration,
    pub max_entries: usize,
}

/// Cache configuration. Rules are matched by longest prefix; keys matching
/// no rule use the defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    /// Global entry budget enforced by the sweep.
    pub capacity: usize,
    /// Chance that any one write triggers a sweep.
    pub sweep_probability: f64,
    pub rules: Vec<CacheRule>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
            capacity: 256,
            sweep_probability: 0.1,
            rules: vec![
                // The template catalogue barely changes.
                CacheRule {
                    prefix: "/templates".into(),
                    ttl: Duration::from_secs(600),
                    max_entries: 32,
                },
                CacheRule {
                    prefix: "/analytics".into(),
                    ttl: Duration::from_secs(60),
                    max_entries: 64,
                },
            ],
        }
    }
}

struct Entry {
    value: Value,
    stored_at: Instant,
    expires_at: Instant,
}

/// Read-only introspection snapshot, for operational visibility.
#[derive(Debug, Clone)]
pub struct CacheDebug {
    pub size: usize,
    pub entries: Vec<CacheEntryInfo>,
}

#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub key: String,
    pub age: Duration,
    pub ttl_remaining: Duration,
}

/// The response cache behind `get_cached`.
pub struct ResponseCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached value for `key`, unless absent or expired. An expired entry is
    /// deleted on the way out — identical to a miss thereafter.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value under `key` with the TTL its prefix rule dictates.
    pub async fn put(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let ttl = self.ttl_for(&key);
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
                expires_at: now + ttl,
            },
        );

        if rand::random::<f64>() < self.config.sweep_probability {
            Self::sweep_locked(&self.config, &mut entries);
        }
    }

    /// Remove every entry whose key contains `pattern`. Callers invalidate
    /// after mutations to avoid stale reads. Returns the number removed.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Invalidated {} cache entr(ies) matching {:?}", removed, pattern);
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Run the eviction sweep now instead of waiting for a write to trigger it.
    pub async fn sweep(&self) {
        let mut entries = self.entries.write().await;
        Self::sweep_locked(&self.config, &mut entries);
    }

    pub async fn debug_snapshot(&self) -> CacheDebug {
        let entries = self.entries.read().await;
        let now = Instant::now();
        let mut infos: Vec<CacheEntryInfo> = entries
            .iter()
            .map(|(key, entry)| CacheEntryInfo {
                key: key.clone(),
                age: now.duration_since(entry.stored_at),
                ttl_remaining: entry.expires_at.saturating_duration_since(now),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        CacheDebug {
            size: entries.len(),
            entries: infos,
        }
    }

    fn ttl_for(&self, key: &str) -> Duration {
        self.config
            .rules
            .iter()
            .filter(|rule| key.starts_with(&rule.prefix))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.ttl)
            .unwrap_or(self.config.default_ttl)
    }

    fn sweep_locked(config: &CacheConfig, entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);

        // Per-prefix budgets, oldest entries under each prefix first.
        for rule in &config.rules {
            let mut keyed: Vec<(Instant, String)> = entries
                .iter()
                .filter(|(key, _)| key.starts_with(&rule.prefix))
                .map(|(key, entry)| (entry.stored_at, key.clone()))
                .collect();
            if keyed.len() > rule.max_entries {
                keyed.sort();
                let excess = keyed.len() - rule.max_entries;
                for (_, key) in keyed.into_iter().take(excess) {
                    entries.remove(&key);
                }
            }
        }

        // Global budget, oldest first.
        if entries.len() > config.capacity {
            let mut keyed: Vec<(Instant, String)> = entries
                .iter()
                .map(|(key, entry)| (entry.stored_at, key.clone()))
                .collect();
            keyed.sort();
            let excess = entries.len() - config.capacity;
            for (_, key) in keyed.into_iter().take(excess) {
                entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_with(capacity: usize, default_ttl: Duration, rules: Vec<CacheRule>) -> ResponseCache {
        ResponseCache::new(CacheConfig {
            default_ttl,
            capacity,
            // Deterministic tests: sweep only when called explicitly.
            sweep_probability: 0.0,
            rules,
        })
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let cache = cache_with(16, Duration::from_secs(30), vec![]);
        cache.put("/studies?page=1", json!({"items": [1, 2, 3]})).await;
        let hit = cache.get("/studies?page=1").await.unwrap();
        assert_eq!(hit, json!({"items": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn test_expired_read_misses_and_deletes() {
        let cache = cache_with(16, Duration::from_millis(40), vec![]);
        cache.put("/studies", json!(1)).await;
        assert!(cache.get("/studies").await.is_some());

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("/studies").await.is_none());
        // The expired entry is gone, not just hidden.
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_prefix_rule_ttl_applies() {
        let rules = vec![CacheRule {
            prefix: "/templates".into(),
            ttl: Duration::from_millis(200),
            max_entries: 8,
        }];
        let cache = cache_with(16, Duration::from_millis(40), rules);
        cache.put("/templates", json!("catalogue")).await;
        cache.put("/studies", json!("listing")).await;

        std::thread::sleep(Duration::from_millis(60));
        // Default-TTL entry expired; the /templates rule keeps its entry alive.
        assert!(cache.get("/studies").await.is_none());
        assert!(cache.get("/templates").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_by_substring() {
        let cache = cache_with(16, Duration::from_secs(30), vec![]);
        cache.put("/studies?page=1", json!(1)).await;
        cache.put("/studies/s-9/participants", json!(2)).await;
        cache.put("/templates", json!(3)).await;

        let removed = cache.invalidate("/studies").await;
        assert_eq!(removed, 2);
        assert!(cache.get("/studies?page=1").await.is_none());
        assert!(cache.get("/templates").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_enforces_capacity_oldest_first() {
        let cache = cache_with(10, Duration::from_secs(30), vec![]);
        for i in 0..20 {
            cache.put(format!("/studies?page={}", i), json!(i)).await;
            // Distinct stored_at ordering on coarse clocks.
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(cache.len().await, 20);

        cache.sweep().await;
        assert_eq!(cache.len().await, 10);
        // The ten most recent writes survive.
        for i in 10..20 {
            assert!(
                cache.get(&format!("/studies?page={}", i)).await.is_some(),
                "entry {} should have survived",
                i
            );
        }
        for i in 0..10 {
            assert!(cache.get(&format!("/studies?page={}", i)).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_sweep_enforces_prefix_budget() {
        let rules = vec![CacheRule {
            prefix: "/templates".into(),
            ttl: Duration::from_secs(30),
            max_entries: 2,
        }];
        let cache = cache_with(100, Duration::from_secs(30), rules);
        for i in 0..5 {
            cache.put(format!("/templates?page={}", i), json!(i)).await;
            std::thread::sleep(Duration::from_millis(2));
        }
        cache.put("/studies", json!("untouched")).await;

        cache.sweep().await;
        let snapshot = cache.debug_snapshot().await;
        let template_count = snapshot
            .entries
            .iter()
            .filter(|e| e.key.starts_with("/templates"))
            .count();
        assert_eq!(template_count, 2);
        assert!(cache.get("/templates?page=4").await.is_some());
        assert!(cache.get("/studies").await.is_some());
    }

    #[tokio::test]
    async fn test_debug_snapshot_reports_age_and_ttl() {
        let cache = cache_with(16, Duration::from_secs(30), vec![]);
        cache.put("/studies", json!(1)).await;

        let snapshot = cache.debug_snapshot().await;
        assert_eq!(snapshot.size, 1);
        let info = &snapshot.entries[0];
        assert_eq!(info.key, "/studies");
        assert!(info.age < Duration::from_secs(1));
        assert!(info.ttl_remaining > Duration::from_secs(28));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = cache_with(16, Duration::from_secs(30), vec![]);
        cache.put("/studies", json!(1)).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
