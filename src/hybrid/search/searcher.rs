//! Hybrid search requests, fused results, and responses.
//!
//! These are the externally visible shapes of the engine: what a caller submits
//! ([`HybridSearchRequest`]) and what it gets back ([`HybridSearchResponse`]).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BraidError, Result};
use crate::hybrid::backend::{RawKeywordResult, RawSearchResult};
use crate::hybrid::config::MAX_RESULT_LIMIT;
use crate::hybrid::search::query::{QueryComplexity, QueryType};

/// Maximum query length in characters.
pub const MAX_QUERY_CHARS: usize = 1000;

/// Free-form metadata attached to a stored document.
pub type Metadata = HashMap<String, Value>;

/// Opaque backend filters. Ordered so that requests serialize canonically.
pub type Filters = BTreeMap<String, Value>;

/// Which retrieval paths a request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Let the engine decide from the query.
    #[default]
    Auto,
    /// Semantic search only.
    Vector,
    /// Lexical search only.
    Keyword,
    /// Both paths, fused.
    Hybrid,
}

impl SearchStrategy {
    /// Get the name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Auto => "auto",
            SearchStrategy::Vector => "vector",
            SearchStrategy::Keyword => "keyword",
            SearchStrategy::Hybrid => "hybrid",
        }
    }

    /// Whether the vector backend is consulted.
    pub fn uses_vector(&self) -> bool {
        matches!(self, SearchStrategy::Vector | SearchStrategy::Hybrid)
    }

    /// Whether the keyword backend is consulted.
    pub fn uses_keyword(&self) -> bool {
        matches!(self, SearchStrategy::Keyword | SearchStrategy::Hybrid)
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = BraidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SearchStrategy::Auto),
            "vector" => Ok(SearchStrategy::Vector),
            "keyword" => Ok(SearchStrategy::Keyword),
            "hybrid" => Ok(SearchStrategy::Hybrid),
            other => Err(BraidError::validation(format!(
                "unknown search strategy '{other}'"
            ))),
        }
    }
}

fn default_include_metadata() -> bool {
    true
}

/// A tenant-scoped hybrid search request.
///
/// # Examples
///
/// ```
/// use braid::hybrid::search::searcher::{HybridSearchRequest, SearchStrategy};
///
/// let request = HybridSearchRequest::new("opening hours on sunday", "tenant-42")
///     .with_strategy(SearchStrategy::Hybrid)
///     .with_limit(5);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridSearchRequest {
    /// Free-text query.
    pub query: String,
    /// Tenant every result must belong to.
    pub tenant_id: String,
    /// Filters passed through to both backends.
    #[serde(default)]
    pub filters: Filters,
    /// Requested retrieval strategy.
    #[serde(default)]
    pub search_strategy: SearchStrategy,
    /// Result limit; the configured default applies when unset.
    #[serde(default)]
    pub result_limit: Option<usize>,
    /// Whether result metadata is returned.
    #[serde(default = "default_include_metadata")]
    pub include_metadata: bool,
}

impl HybridSearchRequest {
    /// Create a new request with the default strategy and limit.
    pub fn new(query: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            tenant_id: tenant_id.into(),
            filters: Filters::new(),
            search_strategy: SearchStrategy::Auto,
            result_limit: None,
            include_metadata: true,
        }
    }

    /// Add a backend filter.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Set the retrieval strategy.
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.search_strategy = strategy;
        self
    }

    /// Set the retrieval strategy from its name.
    pub fn with_strategy_name(self, strategy: &str) -> Result<Self> {
        Ok(self.with_strategy(strategy.parse()?))
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.result_limit = Some(limit);
        self
    }

    /// Choose whether result metadata is returned.
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    /// Check the request before any backend is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(BraidError::validation("query must not be empty"));
        }

        let chars = self.query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(BraidError::validation(format!(
                "query must be at most {MAX_QUERY_CHARS} characters, got {chars}"
            )));
        }

        if self.tenant_id.trim().is_empty() {
            return Err(BraidError::validation("tenant id must not be empty"));
        }

        if let Some(limit) = self.result_limit
            && (limit == 0 || limit > MAX_RESULT_LIMIT)
        {
            return Err(BraidError::validation(format!(
                "result limit must be between 1 and {MAX_RESULT_LIMIT}, got {limit}"
            )));
        }

        Ok(())
    }
}

/// Retrieval path that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    Vector,
    Keyword,
}

impl SearchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSource::Vector => "vector",
            SearchSource::Keyword => "keyword",
        }
    }
}

/// A single ranked result with provenance.
///
/// Built only through [`FusedResult::assemble`], which derives `sources` from
/// the per-source ranks so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    /// Document ID.
    pub id: String,
    /// Display content.
    pub content: String,
    /// Document metadata.
    pub metadata: Metadata,
    /// Stored embedding, when the vector backend returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Vector similarity; `None` when the vector path did not return this id.
    pub vector_score: Option<f32>,
    /// Keyword score; `None` when the keyword path did not return this id.
    pub keyword_score: Option<f32>,
    /// Combined ranking value.
    pub fusion_score: f32,
    /// Paths that returned this id. Never empty.
    pub sources: Vec<SearchSource>,
    /// 1-based position in the vector list.
    pub vector_rank: Option<usize>,
    /// 1-based position in the keyword list.
    pub keyword_rank: Option<usize>,
}

impl FusedResult {
    /// Build a fused result from whichever sources matched.
    ///
    /// The vector record supplies display fields when both matched. Returns
    /// `None` when neither source is present.
    pub fn assemble(
        vector: Option<(&RawSearchResult, usize)>,
        keyword: Option<(&RawKeywordResult, usize)>,
        fusion_score: f32,
    ) -> Option<Self> {
        let (id, content, metadata, embedding) = match (vector, keyword) {
            (Some((v, _)), _) => (
                v.id.clone(),
                v.content.clone(),
                v.metadata.clone(),
                v.embedding.clone(),
            ),
            (None, Some((k, _))) => (k.id.clone(), k.content.clone(), k.metadata.clone(), None),
            (None, None) => return None,
        };

        let mut sources = Vec::with_capacity(2);
        if vector.is_some() {
            sources.push(SearchSource::Vector);
        }
        if keyword.is_some() {
            sources.push(SearchSource::Keyword);
        }

        Some(Self {
            id,
            content,
            metadata,
            embedding,
            vector_score: vector.map(|(v, _)| v.similarity),
            keyword_score: keyword.map(|(k, _)| k.score),
            fusion_score,
            sources,
            vector_rank: vector.map(|(_, rank)| rank),
            keyword_rank: keyword.map(|(_, rank)| rank),
        })
    }

    /// Whether the given path returned this result.
    pub fn has_source(&self, source: SearchSource) -> bool {
        self.sources.contains(&source)
    }
}

/// Wall-clock time spent in each pipeline stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub cache_lookup_ms: f64,
    pub preprocess_ms: f64,
    pub vector_search_ms: f64,
    pub keyword_search_ms: f64,
    pub fusion_ms: f64,
}

/// Metadata describing how a response was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    /// Number of results returned.
    pub total_results: usize,
    /// Strategy actually executed (never `auto`).
    pub search_strategy: SearchStrategy,
    /// End-to-end time for this request.
    pub processing_time_ms: f64,
    /// Results returned by the vector backend.
    pub vector_results: usize,
    /// Results returned by the keyword backend.
    pub keyword_results: usize,
    /// Distinct candidates before truncation.
    pub fused_results: usize,
    pub per_stage_timings: StageTimings,
    pub query_type: Option<QueryType>,
    pub query_complexity: Option<QueryComplexity>,
    /// Served from the result cache.
    pub cache_hit: bool,
    /// The keyword path failed and the search ran vector-only.
    pub keyword_degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation_reason: Option<String>,
}

/// Ranked results plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchResponse {
    /// Results sorted by fusion score (descending).
    pub results: Vec<FusedResult>,
    pub metadata: SearchMetadata,
}

impl HybridSearchResponse {
    /// Get the number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if results are empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Get the best result.
    pub fn best_result(&self) -> Option<&FusedResult> {
        self.results.first()
    }

    /// Result ids in rank order.
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }

    /// Copy without stored embeddings, for caching.
    pub(crate) fn without_embeddings(&self) -> Self {
        let mut copy = self.clone();
        for result in &mut copy.results {
            result.embedding = None;
        }
        copy
    }

    /// Drop per-result metadata.
    pub(crate) fn strip_result_metadata(&mut self) {
        for result in &mut self.results {
            result.metadata.clear();
        }
    }
}
