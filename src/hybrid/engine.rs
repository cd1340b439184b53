//! Hybrid search service.
//!
//! [`HybridSearchService`] owns the runtime configuration, the result cache and
//! the statistics tracker, and drives one request through the pipeline:
//! validation, cache lookup, query preparation, backend invocation, fusion,
//! cache write and statistics.
//!
//! The service is constructed explicitly by the host application and shared
//! behind an `Arc`; separate instances share no state.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use braid::hybrid::config::HybridQueryConfig;
//! use braid::hybrid::engine::HybridSearchService;
//! use braid::hybrid::memory::{HashingEmbedder, MemoryKeywordIndex, MemoryVectorIndex};
//! use braid::hybrid::search::searcher::HybridSearchRequest;
//!
//! # async fn example() -> braid::error::Result<()> {
//! let vector = Arc::new(MemoryVectorIndex::new(Arc::new(HashingEmbedder::default())));
//! let keyword = Arc::new(MemoryKeywordIndex::new());
//! let service = HybridSearchService::new(HybridQueryConfig::default(), vector, keyword)?;
//!
//! let request = HybridSearchRequest::new("opening hours", "tenant-1").with_limit(5);
//! let response = service.search(&request).await?;
//! println!("{} results", response.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::hybrid::backend::{KeywordSearchService, SearchPlan, VectorSearchService, run_searches};
use crate::hybrid::cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ExternalCacheStore, ResultCache, cache_key};
use crate::hybrid::config::{ConfigUpdate, HybridQueryConfig};
use crate::hybrid::search::merger::FusionEngine;
use crate::hybrid::search::query::{analyze_query, prepare_keyword_query, resolve_strategy};
use crate::hybrid::search::scorer::FusionParams;
use crate::hybrid::search::searcher::{
    HybridSearchRequest, HybridSearchResponse, SearchMetadata, StageTimings,
};
use crate::hybrid::stats::{HybridSearchStats, StatsTracker};

/// Query used by [`HybridSearchService::health_check`].
pub const HEALTH_CHECK_QUERY: &str = "health check test";
/// Tenant used by [`HybridSearchService::health_check`].
pub const HEALTH_CHECK_TENANT: &str = "health-check";

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Tenant-scoped hybrid retrieval over a vector and a keyword backend.
pub struct HybridSearchService {
    config: RwLock<HybridQueryConfig>,
    vector: Arc<dyn VectorSearchService>,
    keyword: Arc<dyn KeywordSearchService>,
    cache: ResultCache,
    stats: StatsTracker,
}

impl HybridSearchService {
    /// Create a new service. Fails if the configuration is invalid.
    pub fn new(
        config: HybridQueryConfig,
        vector: Arc<dyn VectorSearchService>,
        keyword: Arc<dyn KeywordSearchService>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: RwLock::new(config),
            vector,
            keyword,
            cache: ResultCache::new(DEFAULT_CACHE_CAPACITY),
            stats: StatsTracker::new(),
        })
    }

    /// Back the result cache with an external store.
    pub fn with_external_cache(mut self, store: Arc<dyn ExternalCacheStore>) -> Self {
        self.cache = ResultCache::new(DEFAULT_CACHE_CAPACITY).with_external(store);
        self
    }

    /// Run a hybrid search.
    pub async fn search(&self, request: &HybridSearchRequest) -> Result<HybridSearchResponse> {
        self.execute(request, true).await
    }

    async fn execute(
        &self,
        request: &HybridSearchRequest,
        use_cache: bool,
    ) -> Result<HybridSearchResponse> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();

        request.validate()?;

        // One snapshot per request; concurrent updates apply to later requests.
        let config = self.config();
        let limit = request.result_limit.unwrap_or(config.final_result_limit);
        let params = FusionParams::from(&config);
        let mut timings = StageTimings::default();

        let key = if use_cache && config.cache_results {
            match cache_key(request, limit, &params) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("[{request_id}] could not derive cache key: {e}");
                    None
                }
            }
        } else {
            None
        };

        if let Some(key) = &key {
            let lookup = Instant::now();
            let cached = self.cache.get(key).await;
            timings.cache_lookup_ms = elapsed_ms(lookup);

            if let Some(mut response) = cached {
                response.metadata.cache_hit = true;
                response.metadata.per_stage_timings = timings;
                response.metadata.processing_time_ms = elapsed_ms(start);

                debug!(
                    "[{request_id}] cache hit for tenant {}: {} results",
                    request.tenant_id,
                    response.len()
                );
                self.stats.record(
                    response.metadata.processing_time_ms,
                    response.len(),
                    true,
                    false,
                );

                if !request.include_metadata {
                    response.strip_result_metadata();
                }
                return Ok(response);
            }
        }

        let preprocess = Instant::now();
        let query = request.query.trim();
        let prepared_query = prepare_keyword_query(query);
        let analysis = analyze_query(query);
        let strategy = resolve_strategy(request.search_strategy);
        timings.preprocess_ms = elapsed_ms(preprocess);

        debug!(
            "[{request_id}] tenant {} strategy {} ({:?}, {:?}) keyword query '{prepared_query}'",
            request.tenant_id, strategy, analysis.query_type, analysis.complexity
        );

        let plan = SearchPlan {
            request_id,
            query,
            prepared_query: &prepared_query,
            tenant_id: &request.tenant_id,
            filters: &request.filters,
            strategy,
            max_vector_results: config.max_vector_results,
            max_keyword_results: config.max_keyword_results,
            parallel: config.enable_parallel_search,
            timeout: config.search_timeout(),
        };

        let backends = match run_searches(self.vector.as_ref(), self.keyword.as_ref(), &plan).await
        {
            Ok(backends) => backends,
            Err(e) => {
                warn!("[{request_id}] search failed: {e}");
                return Err(e);
            }
        };
        timings.vector_search_ms = backends.vector.took_ms();
        timings.keyword_search_ms = backends.keyword.took_ms();

        let fusion = Instant::now();
        let outcome = FusionEngine::new(params).fuse_with_counts(
            backends.vector.results(),
            backends.keyword.results(),
            limit,
        );
        timings.fusion_ms = elapsed_ms(fusion);

        let degraded = backends.keyword.is_degraded();
        let mut response = HybridSearchResponse {
            metadata: SearchMetadata {
                total_results: outcome.results.len(),
                search_strategy: strategy,
                processing_time_ms: elapsed_ms(start),
                vector_results: backends.vector.results().len(),
                keyword_results: backends.keyword.results().len(),
                fused_results: outcome.candidates,
                per_stage_timings: timings,
                query_type: Some(analysis.query_type),
                query_complexity: Some(analysis.complexity),
                cache_hit: false,
                keyword_degraded: degraded,
                degradation_reason: backends.keyword.degradation_reason().map(str::to_string),
            },
            results: outcome.results,
        };

        // A degraded response would hide the keyword path's recovery until it expired.
        if let Some(key) = &key
            && !degraded
        {
            self.cache.put(key, &response, config.cache_ttl_secs).await;
        }

        self.stats.record(
            response.metadata.processing_time_ms,
            response.len(),
            false,
            degraded,
        );

        debug!(
            "[{request_id}] {} results ({} vector, {} keyword, {} candidates) in {:.2}ms",
            response.len(),
            response.metadata.vector_results,
            response.metadata.keyword_results,
            response.metadata.fused_results,
            response.metadata.processing_time_ms
        );

        if !request.include_metadata {
            response.strip_result_metadata();
        }
        Ok(response)
    }

    /// Current aggregate statistics.
    pub fn stats(&self) -> HybridSearchStats {
        self.stats.snapshot()
    }

    /// Result cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Run a canned query through the pipeline, bypassing the cache.
    ///
    /// A cached response would report healthy without touching either
    /// backend, so the canned query always reaches them.
    pub async fn health_check(&self) -> bool {
        let request = HybridSearchRequest::new(HEALTH_CHECK_QUERY, HEALTH_CHECK_TENANT).with_limit(1);

        match self.execute(&request, false).await {
            Ok(_) => true,
            Err(e) => {
                error!("hybrid search health check failed: {e}");
                false
            }
        }
    }

    /// Apply a partial configuration update.
    ///
    /// The merged configuration is validated as a whole; on error nothing
    /// changes. Cached entries computed under the old fusion settings stop
    /// matching because the settings are part of the cache key.
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<()> {
        let mut config = self.config.write();
        let next = config.merged(update)?;
        *config = next;

        info!(
            "hybrid search config updated: algorithm={} weights={}/{} rrf_k={} parallel={} cache={}",
            config.fusion_algorithm,
            config.vector_weight,
            config.keyword_weight,
            config.rrf_constant,
            config.enable_parallel_search,
            config.cache_results
        );
        Ok(())
    }

    /// Copy of the active configuration.
    pub fn config(&self) -> HybridQueryConfig {
        self.config.read().clone()
    }

    /// Drop every in-process cache entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("hybrid search cache cleared");
    }
}
