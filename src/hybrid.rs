//! Hybrid search combining vector and keyword retrieval.
//!
//! A request is validated, looked up in the result cache, prepared for the
//! keyword backend, sent to both backends (concurrently by default), and the
//! two ranked lists are fused into one:
//!
//! - **Reciprocal rank fusion** over per-source ranks (the default)
//! - **Weighted** sum of clamped per-source scores
//! - **Adaptive**, a fixed blend of the two
//!
//! # Architecture
//!
//! - **Configuration**: `config` - validated, runtime-updatable settings
//! - **Backends**: `backend` - service contracts and their invocation
//! - **Search submodule**: query preparation, scoring and result merging
//! - **Cache**: `cache` - two-tier response cache
//! - **Statistics**: `stats` - running aggregates
//! - **Engine**: `engine` - the [`HybridSearchService`](engine::HybridSearchService)
//! - **Reference backends**: `memory` - in-process indexes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use braid::hybrid::config::HybridQueryConfig;
//! use braid::hybrid::engine::HybridSearchService;
//! use braid::hybrid::memory::{Document, HashingEmbedder, MemoryKeywordIndex, MemoryVectorIndex};
//! use braid::hybrid::search::searcher::HybridSearchRequest;
//!
//! # tokio_test::block_on(async {
//! let vector = Arc::new(MemoryVectorIndex::new(Arc::new(HashingEmbedder::default())));
//! let keyword = Arc::new(MemoryKeywordIndex::new());
//!
//! let doc = Document::new("hours", "tenant-1", "We are open every day until nine");
//! vector.add(doc.clone());
//! keyword.add(doc);
//!
//! let service = HybridSearchService::new(HybridQueryConfig::default(), vector, keyword).unwrap();
//! let response = service
//!     .search(&HybridSearchRequest::new("when are you open", "tenant-1"))
//!     .await
//!     .unwrap();
//! assert_eq!(response.ids(), vec!["hours"]);
//! # });
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod memory;
pub mod search;
pub mod stats;
