//! # Braid
//!
//! Tenant-scoped hybrid retrieval for Rust.
//!
//! ## Features
//!
//! - Vector and keyword search behind pluggable async backends
//! - Reciprocal rank, weighted and adaptive fusion
//! - Graceful degradation when the keyword backend fails
//! - Two-tier response cache keyed on request and fusion settings
//! - Running statistics and a pipeline health check

pub mod cli;
pub mod error;
pub mod hybrid;

pub mod prelude {
    pub use crate::error::{BraidError, Result};
    pub use crate::hybrid::backend::{
        KeywordSearchService, RawKeywordResult, RawSearchResult, VectorSearchService,
    };
    pub use crate::hybrid::cache::ExternalCacheStore;
    pub use crate::hybrid::config::{ConfigUpdate, FusionAlgorithm, HybridQueryConfig};
    pub use crate::hybrid::engine::HybridSearchService;
    pub use crate::hybrid::search::searcher::{
        FusedResult, HybridSearchRequest, HybridSearchResponse, SearchSource, SearchStrategy,
    };
    pub use crate::hybrid::stats::HybridSearchStats;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
