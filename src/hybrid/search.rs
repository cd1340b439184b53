//! Hybrid search execution.
//!
//! Request and response shapes, keyword query preparation, fusion scoring and
//! result merging.

pub mod merger;
pub mod query;
pub mod scorer;
pub mod searcher;
