//! Search backend contracts and their invocation.
//!
//! The engine consumes two retrieval services it does not own: a vector
//! similarity service and a keyword (full-text) service. Both are tenant-scoped
//! by the caller. This module defines their contracts and runs them for one
//! request, in parallel or sequentially, under a single shared deadline.
//!
//! The two paths fail differently. A vector failure or timeout fails the whole
//! request. A keyword failure or timeout is logged and reported as
//! [`SourceOutcome::Degraded`], so the request continues vector-only.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, timeout_at};
use uuid::Uuid;

use crate::error::{BraidError, Result};
use crate::hybrid::search::searcher::{Filters, Metadata, SearchStrategy};

/// A result from the vector backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResult {
    pub id: String,
    pub content: String,
    /// Similarity, expected in [0, 1] but not enforced.
    pub similarity: f32,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl RawSearchResult {
    /// Create a new vector result.
    pub fn new(id: impl Into<String>, content: impl Into<String>, similarity: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            similarity,
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    /// Add metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add the stored embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A result from the keyword backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKeywordResult {
    pub id: String,
    pub content: String,
    /// Backend relevance score. May exceed 1.
    pub score: f32,
    /// Position reported by the backend.
    pub rank: usize,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RawKeywordResult {
    /// Create a new keyword result.
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32, rank: usize) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
            rank,
            metadata: Metadata::new(),
        }
    }

    /// Add metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Semantic search over a tenant's documents.
#[async_trait]
pub trait VectorSearchService: Send + Sync {
    /// Return up to `limit` results for `query`, best first.
    async fn search(
        &self,
        query: &str,
        tenant_id: &str,
        filters: &Filters,
        limit: usize,
    ) -> Result<Vec<RawSearchResult>>;
}

/// Lexical search over a tenant's documents.
#[async_trait]
pub trait KeywordSearchService: Send + Sync {
    /// Return up to `limit` results for an already prepared query, best first.
    async fn search(
        &self,
        prepared_query: &str,
        tenant_id: &str,
        filters: &Filters,
        limit: usize,
    ) -> Result<Vec<RawKeywordResult>>;
}

/// What one retrieval path produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    /// The backend answered.
    Completed { results: Vec<T>, took: Duration },
    /// The backend failed or timed out and the path was dropped.
    Degraded { reason: String, took: Duration },
    /// The resolved strategy did not use this path.
    Skipped,
}

impl<T> SourceOutcome<T> {
    /// Results, empty unless completed.
    pub fn results(&self) -> &[T] {
        match self {
            SourceOutcome::Completed { results, .. } => results,
            _ => &[],
        }
    }

    /// Time spent waiting on the backend, in milliseconds.
    pub fn took_ms(&self) -> f64 {
        match self {
            SourceOutcome::Completed { took, .. } | SourceOutcome::Degraded { took, .. } => {
                took.as_secs_f64() * 1000.0
            }
            SourceOutcome::Skipped => 0.0,
        }
    }

    /// Failure reason, if the path was dropped.
    pub fn degradation_reason(&self) -> Option<&str> {
        match self {
            SourceOutcome::Degraded { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SourceOutcome::Degraded { .. })
    }
}

/// Everything the backends need for one request.
#[derive(Debug, Clone)]
pub struct SearchPlan<'a> {
    pub request_id: Uuid,
    pub query: &'a str,
    pub prepared_query: &'a str,
    pub tenant_id: &'a str,
    pub filters: &'a Filters,
    /// Resolved strategy (never `auto`).
    pub strategy: SearchStrategy,
    pub max_vector_results: usize,
    pub max_keyword_results: usize,
    pub parallel: bool,
    /// Bound on the combined wait for both paths.
    pub timeout: Duration,
}

/// Per-path outcomes for one request.
#[derive(Debug, Clone)]
pub struct BackendResults {
    pub vector: SourceOutcome<RawSearchResult>,
    pub keyword: SourceOutcome<RawKeywordResult>,
}

/// Run the backends a plan calls for.
///
/// Fails only when the vector path fails or misses the deadline.
pub async fn run_searches(
    vector: &dyn VectorSearchService,
    keyword: &dyn KeywordSearchService,
    plan: &SearchPlan<'_>,
) -> Result<BackendResults> {
    let deadline = Instant::now() + plan.timeout;

    if plan.parallel {
        let (vector_outcome, keyword_outcome) = tokio::join!(
            run_vector(vector, plan, deadline),
            run_keyword(keyword, plan, deadline)
        );
        Ok(BackendResults {
            vector: vector_outcome?,
            keyword: keyword_outcome,
        })
    } else {
        let vector_outcome = run_vector(vector, plan, deadline).await?;
        let keyword_outcome = run_keyword(keyword, plan, deadline).await;
        Ok(BackendResults {
            vector: vector_outcome,
            keyword: keyword_outcome,
        })
    }
}

async fn run_vector(
    service: &dyn VectorSearchService,
    plan: &SearchPlan<'_>,
    deadline: Instant,
) -> Result<SourceOutcome<RawSearchResult>> {
    if !plan.strategy.uses_vector() {
        return Ok(SourceOutcome::Skipped);
    }

    let start = Instant::now();
    let search = service.search(
        plan.query,
        plan.tenant_id,
        plan.filters,
        plan.max_vector_results,
    );

    match timeout_at(deadline, search).await {
        Ok(Ok(results)) => {
            debug!(
                "[{}] vector search returned {} results in {:?}",
                plan.request_id,
                results.len(),
                start.elapsed()
            );
            Ok(SourceOutcome::Completed {
                results,
                took: start.elapsed(),
            })
        }
        Ok(Err(e)) => Err(BraidError::backend(format!("vector search failed: {e}"))),
        Err(_) => Err(BraidError::timeout(format!(
            "vector search exceeded {}ms",
            plan.timeout.as_millis()
        ))),
    }
}

async fn run_keyword(
    service: &dyn KeywordSearchService,
    plan: &SearchPlan<'_>,
    deadline: Instant,
) -> SourceOutcome<RawKeywordResult> {
    if !plan.strategy.uses_keyword() {
        return SourceOutcome::Skipped;
    }

    let start = Instant::now();
    let search = service.search(
        plan.prepared_query,
        plan.tenant_id,
        plan.filters,
        plan.max_keyword_results,
    );

    let reason = match timeout_at(deadline, search).await {
        Ok(Ok(results)) => {
            debug!(
                "[{}] keyword search returned {} results in {:?}",
                plan.request_id,
                results.len(),
                start.elapsed()
            );
            return SourceOutcome::Completed {
                results,
                took: start.elapsed(),
            };
        }
        Ok(Err(e)) => format!("keyword search failed: {e}"),
        Err(_) => format!("keyword search exceeded {}ms", plan.timeout.as_millis()),
    };

    warn!(
        "[{}] {reason}; continuing with vector results only",
        plan.request_id
    );
    SourceOutcome::Degraded {
        reason,
        took: start.elapsed(),
    }
}
