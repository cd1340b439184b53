//! Two-tier cache for fused search responses.
//!
//! Responses are keyed by a digest of the request fields that affect the
//! result together with the active fusion parameters, so a configuration
//! change never serves a response computed under the old settings.
//!
//! The in-process tier is an LRU bounded to a fixed number of slots. The
//! optional external tier is any [`ExternalCacheStore`]. Both tiers store an
//! expiry timestamp and both check it on read. The cache is best-effort:
//! external failures and undecodable payloads are logged and read as misses.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hybrid::config::FusionAlgorithm;
use crate::hybrid::search::scorer::FusionParams;
use crate::hybrid::search::searcher::{
    Filters, HybridSearchRequest, HybridSearchResponse, SearchStrategy,
};

/// Slot budget of the in-process tier.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Longest expiry the cache will record, one year.
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const KEY_PREFIX: &str = "hybrid:";

/// External key-value store backing the second cache tier.
#[async_trait]
pub trait ExternalCacheStore: Send + Sync {
    /// Fetch a value, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value that the store itself expires after `ttl_secs`.
    async fn put(&self, key: &str, value: String, ttl_secs: u64) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheKeyMaterial<'a> {
    query: &'a str,
    tenant_id: &'a str,
    filters: &'a Filters,
    search_strategy: SearchStrategy,
    result_limit: usize,
    fusion_algorithm: FusionAlgorithm,
    vector_weight: f32,
    keyword_weight: f32,
    rrf_constant: f32,
}

/// Derive the cache key for a request under the given fusion parameters.
///
/// `result_limit` is the effective limit after defaults are applied.
pub fn cache_key(
    request: &HybridSearchRequest,
    result_limit: usize,
    params: &FusionParams,
) -> Result<String> {
    let material = CacheKeyMaterial {
        query: request.query.trim(),
        tenant_id: &request.tenant_id,
        filters: &request.filters,
        search_strategy: request.search_strategy,
        result_limit,
        fusion_algorithm: params.algorithm,
        vector_weight: params.vector_weight,
        keyword_weight: params.keyword_weight,
        rrf_constant: params.rrf_constant,
    };

    let canonical = serde_json::to_vec(&material)?;
    Ok(format!("{KEY_PREFIX}{}", blake3::hash(&canonical).to_hex()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedResponse {
    response: HybridSearchResponse,
    expires_at: DateTime<Utc>,
}

impl CachedResponse {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

type LruTier = LruCache<String, CachedResponse>;

/// Read a live entry and mark it most recently used. Expired entries are dropped.
fn lookup_live(tier: &mut LruTier, key: &str, now: DateTime<Utc>) -> Option<HybridSearchResponse> {
    let live = tier.peek(key).map(|entry| entry.is_live(now))?;
    if !live {
        tier.pop(key);
        return None;
    }
    tier.get(key).map(|entry| entry.response.clone())
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Cache of fused responses.
pub struct ResultCache {
    local: Mutex<LruTier>,
    external: Option<Arc<dyn ExternalCacheStore>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create an in-process cache with `capacity` slots, at least one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            local: Mutex::new(LruCache::new(capacity)),
            external: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Add an external tier.
    pub fn with_external(mut self, store: Arc<dyn ExternalCacheStore>) -> Self {
        self.external = Some(store);
        self
    }

    /// Look up a response, checking the in-process tier first.
    pub async fn get(&self, key: &str) -> Option<HybridSearchResponse> {
        let now = Utc::now();

        let local_hit = lookup_live(&mut self.local.lock(), key, now);
        if let Some(response) = local_hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(response);
        }

        if let Some(entry) = self.get_external(key, now).await {
            debug!("cache entry {key} promoted from external store");
            let response = entry.response.clone();
            self.local.lock().put(key.to_string(), entry);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(response);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn get_external(&self, key: &str, now: DateTime<Utc>) -> Option<CachedResponse> {
        let store = self.external.as_ref()?;

        let raw = match store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("external cache read failed for {key}: {e}");
                return None;
            }
        };

        match serde_json::from_str::<CachedResponse>(&raw) {
            Ok(entry) if entry.is_live(now) => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("discarding undecodable cache entry {key}: {e}");
                None
            }
        }
    }

    /// Store a response in both tiers for `ttl_secs`.
    pub async fn put(&self, key: &str, response: &HybridSearchResponse, ttl_secs: u64) {
        let ttl = ChronoDuration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);
        let entry = CachedResponse {
            response: response.without_embeddings(),
            expires_at: Utc::now() + ttl,
        };

        if let Some(store) = &self.external {
            match serde_json::to_string(&entry) {
                Ok(payload) => {
                    if let Err(e) = store.put(key, payload, ttl_secs).await {
                        warn!("external cache write failed for {key}: {e}");
                    }
                }
                Err(e) => warn!("could not encode cache entry {key}: {e}"),
            }
        }

        self.local.lock().put(key.to_string(), entry);
    }

    /// Empty the in-process tier. External entries expire on their own TTL.
    pub fn clear(&self) {
        self.local.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.local.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let local = self.local.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: local.len(),
            capacity: local.cap().get(),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::error::BraidError;
    use crate::hybrid::search::searcher::{SearchMetadata, StageTimings};
    use tokio_test::assert_ok;

    fn response(marker: usize) -> HybridSearchResponse {
        HybridSearchResponse {
            results: Vec::new(),
            metadata: SearchMetadata {
                total_results: marker,
                search_strategy: SearchStrategy::Hybrid,
                processing_time_ms: 1.0,
                vector_results: 0,
                keyword_results: 0,
                fused_results: 0,
                per_stage_timings: StageTimings::default(),
                query_type: None,
                query_complexity: None,
                cache_hit: false,
                keyword_degraded: false,
                degradation_reason: None,
            },
        }
    }

    fn entry(marker: usize, expires_at: DateTime<Utc>) -> CachedResponse {
        CachedResponse {
            response: response(marker),
            expires_at,
        }
    }

    /// In-memory external store with an optional failure switch.
    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
        failing: bool,
    }

    #[async_trait]
    impl ExternalCacheStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            if self.failing {
                return Err(BraidError::cache("connection refused"));
            }
            Ok(self.values.lock().get(key).cloned())
        }

        async fn put(&self, key: &str, value: String, _ttl_secs: u64) -> Result<()> {
            if self.failing {
                return Err(BraidError::cache("connection refused"));
            }
            self.values.lock().insert(key.to_string(), value);
            Ok(())
        }
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let params = FusionParams::default();
        let request = HybridSearchRequest::new("opening hours", "t1").with_filter("lang", "en");

        let a = assert_ok!(cache_key(&request, 10, &params));
        let b = assert_ok!(cache_key(&request.clone(), 10, &params));
        assert_eq!(a, b);
        assert!(a.starts_with("hybrid:"));
    }

    #[test]
    fn test_cache_key_depends_on_config_and_request() {
        let params = FusionParams::default();
        let request = HybridSearchRequest::new("opening hours", "t1");
        let base = cache_key(&request, 10, &params).unwrap();

        let weighted = FusionParams {
            algorithm: FusionAlgorithm::Weighted,
            ..params
        };
        assert_ne!(base, cache_key(&request, 10, &weighted).unwrap());

        let reweighted = FusionParams {
            vector_weight: 0.5,
            ..params
        };
        assert_ne!(base, cache_key(&request, 10, &reweighted).unwrap());

        assert_ne!(base, cache_key(&request, 5, &params).unwrap());

        let other_tenant = HybridSearchRequest::new("opening hours", "t2");
        assert_ne!(base, cache_key(&other_tenant, 10, &params).unwrap());

        let padded = HybridSearchRequest::new("  opening hours ", "t1");
        assert_eq!(base, cache_key(&padded, 10, &params).unwrap());
    }

    fn tier(capacity: usize) -> LruTier {
        LruCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let far = Utc::now() + ChronoDuration::hours(1);
        let now = Utc::now();
        let mut tier = tier(2);

        tier.put("a".into(), entry(1, far));
        tier.put("b".into(), entry(2, far));
        assert!(lookup_live(&mut tier, "a", now).is_some());

        tier.put("c".into(), entry(3, far));
        assert_eq!(tier.len(), 2);
        assert!(lookup_live(&mut tier, "b", now).is_none());
        assert!(lookup_live(&mut tier, "a", now).is_some());
        assert!(lookup_live(&mut tier, "c", now).is_some());
    }

    #[test]
    fn test_lru_reinsert_does_not_grow() {
        let far = Utc::now() + ChronoDuration::hours(1);
        let mut tier = tier(2);

        tier.put("a".into(), entry(1, far));
        tier.put("a".into(), entry(2, far));
        assert_eq!(tier.len(), 1);
        let hit = lookup_live(&mut tier, "a", Utc::now()).unwrap();
        assert_eq!(hit.metadata.total_results, 2);
    }

    #[test]
    fn test_lru_expired_entries_are_removed() {
        let now = Utc::now();
        let mut tier = tier(4);

        tier.put("old".into(), entry(1, now - ChronoDuration::seconds(1)));
        assert!(lookup_live(&mut tier, "old", now).is_none());
        assert!(tier.is_empty());
    }

    #[test]
    fn test_expired_lookup_does_not_promote() {
        let now = Utc::now();
        let far = now + ChronoDuration::hours(1);
        let mut tier = tier(2);

        tier.put("a".into(), entry(1, far));
        tier.put("stale".into(), entry(2, now - ChronoDuration::seconds(1)));
        assert!(lookup_live(&mut tier, "stale", now).is_none());

        tier.put("b".into(), entry(3, far));
        tier.put("c".into(), entry(4, far));
        assert!(lookup_live(&mut tier, "a", now).is_none());
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn test_zero_capacity_keeps_one_slot() {
        let cache = ResultCache::new(0);
        assert_eq!(cache.stats().capacity, 1);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = ResultCache::default();
        assert!(cache.get("k").await.is_none());

        cache.put("k", &response(7), 60).await;
        let hit = cache.get("k").await.unwrap();
        assert_eq!(hit.metadata.total_results, 7);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.capacity, DEFAULT_CACHE_CAPACITY);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = ResultCache::new(DEFAULT_CACHE_CAPACITY);
        for i in 0..(DEFAULT_CACHE_CAPACITY + 25) {
            cache.put(&format!("k{i}"), &response(i), 60).await;
        }
        assert_eq!(cache.len(), DEFAULT_CACHE_CAPACITY);
        assert!(cache.get("k0").await.is_none());
        assert!(cache.get(&format!("k{}", DEFAULT_CACHE_CAPACITY + 24)).await.is_some());
    }

    #[tokio::test]
    async fn test_external_hit_is_promoted() {
        let store = Arc::new(MapStore::default());
        let writer = ResultCache::new(4).with_external(store.clone());
        writer.put("k", &response(3), 60).await;

        let reader = ResultCache::new(4).with_external(store);
        assert!(reader.is_empty());
        let hit = reader.get("k").await.unwrap();
        assert_eq!(hit.metadata.total_results, 3);
        assert_eq!(reader.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_external_entry_is_a_miss() {
        let store = Arc::new(MapStore::default());
        let stale = entry(1, Utc::now() - ChronoDuration::seconds(5));
        store
            .values
            .lock()
            .insert("k".into(), serde_json::to_string(&stale).unwrap());

        let cache = ResultCache::new(4).with_external(store);
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_external_failures_are_swallowed() {
        let store = Arc::new(MapStore {
            failing: true,
            ..Default::default()
        });
        let cache = ResultCache::new(4).with_external(store);

        cache.put("k", &response(1), 60).await;
        // Local tier still serves the entry.
        assert!(cache.get("k").await.is_some());
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_external_payload_is_a_miss() {
        let store = Arc::new(MapStore::default());
        store.values.lock().insert("k".into(), "not json".into());

        let cache = ResultCache::new(4).with_external(store);
        assert!(cache.get("k").await.is_none());
    }
}
