//! Configuration for hybrid search.
//!
//! [`HybridQueryConfig`] is constructed once by the host application, validated,
//! and handed to the [`HybridSearchService`](crate::hybrid::engine::HybridSearchService).
//! It can be changed at runtime through a [`ConfigUpdate`], which is merged and
//! validated as a whole before it replaces the active configuration.
//!
//! # Examples
//!
//! ```
//! use braid::hybrid::config::{FusionAlgorithm, HybridQueryConfig};
//!
//! let config = HybridQueryConfig::default()
//!     .with_weights(0.7, 0.3)
//!     .with_fusion_algorithm(FusionAlgorithm::Weighted);
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BraidError, Result};

/// Hard upper bound for any result limit.
pub const MAX_RESULT_LIMIT: usize = 100;

/// Algorithm used to combine vector and keyword results into one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FusionAlgorithm {
    /// Reciprocal rank fusion over per-source ranks.
    #[default]
    Rrf,
    /// Weighted sum of clamped per-source scores.
    Weighted,
    /// Fixed 0.7/0.3 blend of the weighted and RRF scores.
    Adaptive,
}

impl FusionAlgorithm {
    /// Get the name of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionAlgorithm::Rrf => "rrf",
            FusionAlgorithm::Weighted => "weighted",
            FusionAlgorithm::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for FusionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionAlgorithm {
    type Err = BraidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rrf" => Ok(FusionAlgorithm::Rrf),
            "weighted" => Ok(FusionAlgorithm::Weighted),
            "adaptive" => Ok(FusionAlgorithm::Adaptive),
            other => Err(BraidError::invalid_config(format!(
                "unknown fusion algorithm '{other}'"
            ))),
        }
    }
}

/// Process-wide hybrid search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HybridQueryConfig {
    /// Weight for vector similarity (0.0-1.0).
    pub vector_weight: f32,

    /// Weight for keyword score (0.0-1.0).
    pub keyword_weight: f32,

    /// Maximum results requested from the vector backend.
    pub max_vector_results: usize,

    /// Maximum results requested from the keyword backend.
    pub max_keyword_results: usize,

    /// Result limit used when a request does not carry its own.
    pub final_result_limit: usize,

    /// Fusion algorithm.
    pub fusion_algorithm: FusionAlgorithm,

    /// RRF smoothing constant `k`.
    pub rrf_constant: f32,

    /// Deadline for both backend searches combined, in milliseconds.
    pub search_timeout_ms: u64,

    /// Run vector and keyword searches concurrently.
    pub enable_parallel_search: bool,

    /// Cache fused responses.
    pub cache_results: bool,

    /// Time-to-live for cached responses, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for HybridQueryConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            keyword_weight: 0.3,
            max_vector_results: 20,
            max_keyword_results: 20,
            final_result_limit: 10,
            fusion_algorithm: FusionAlgorithm::Rrf,
            rrf_constant: 60.0,
            search_timeout_ms: 5_000,
            enable_parallel_search: true,
            cache_results: true,
            cache_ttl_secs: 300,
        }
    }
}

impl HybridQueryConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HybridQueryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the weights for vector and keyword search.
    pub fn with_weights(mut self, vector_weight: f32, keyword_weight: f32) -> Self {
        self.vector_weight = vector_weight;
        self.keyword_weight = keyword_weight;
        self
    }

    /// Set the fusion algorithm.
    pub fn with_fusion_algorithm(mut self, algorithm: FusionAlgorithm) -> Self {
        self.fusion_algorithm = algorithm;
        self
    }

    /// Set the default result limit.
    pub fn with_final_result_limit(mut self, limit: usize) -> Self {
        self.final_result_limit = limit;
        self
    }

    /// Enable or disable concurrent backend searches.
    pub fn with_parallel_search(mut self, enable: bool) -> Self {
        self.enable_parallel_search = enable;
        self
    }

    /// Enable or disable result caching.
    pub fn with_caching(mut self, enable: bool) -> Self {
        self.cache_results = enable;
        self
    }

    /// Set the combined backend deadline.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// The combined backend deadline.
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.vector_weight) {
            return Err(BraidError::invalid_config(
                "vector weight must be between 0.0 and 1.0",
            ));
        }

        if !(0.0..=1.0).contains(&self.keyword_weight) {
            return Err(BraidError::invalid_config(
                "keyword weight must be between 0.0 and 1.0",
            ));
        }

        if self.max_vector_results == 0 || self.max_keyword_results == 0 {
            return Err(BraidError::invalid_config(
                "per-source result caps must be greater than 0",
            ));
        }

        if self.final_result_limit == 0 || self.final_result_limit > MAX_RESULT_LIMIT {
            return Err(BraidError::invalid_config(format!(
                "final result limit must be between 1 and {MAX_RESULT_LIMIT}, got {}",
                self.final_result_limit
            )));
        }

        if !(self.rrf_constant > 0.0 && self.rrf_constant.is_finite()) {
            return Err(BraidError::invalid_config(
                "RRF constant must be a positive number",
            ));
        }

        if self.search_timeout_ms == 0 {
            return Err(BraidError::invalid_config(
                "search timeout must be greater than 0",
            ));
        }

        if self.cache_results && self.cache_ttl_secs == 0 {
            return Err(BraidError::invalid_config(
                "cache TTL must be greater than 0 when caching is enabled",
            ));
        }

        Ok(())
    }

    /// Merge a partial update into a copy of this configuration and validate it.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<Self> {
        let mut next = self.clone();

        if let Some(v) = update.vector_weight {
            next.vector_weight = v;
        }
        if let Some(v) = update.keyword_weight {
            next.keyword_weight = v;
        }
        if let Some(v) = update.max_vector_results {
            next.max_vector_results = v;
        }
        if let Some(v) = update.max_keyword_results {
            next.max_keyword_results = v;
        }
        if let Some(v) = update.final_result_limit {
            next.final_result_limit = v;
        }
        if let Some(v) = update.fusion_algorithm {
            next.fusion_algorithm = v;
        }
        if let Some(v) = update.rrf_constant {
            next.rrf_constant = v;
        }
        if let Some(v) = update.search_timeout_ms {
            next.search_timeout_ms = v;
        }
        if let Some(v) = update.enable_parallel_search {
            next.enable_parallel_search = v;
        }
        if let Some(v) = update.cache_results {
            next.cache_results = v;
        }
        if let Some(v) = update.cache_ttl_secs {
            next.cache_ttl_secs = v;
        }

        next.validate()?;
        Ok(next)
    }
}

/// Partial configuration update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    pub vector_weight: Option<f32>,
    pub keyword_weight: Option<f32>,
    pub max_vector_results: Option<usize>,
    pub max_keyword_results: Option<usize>,
    pub final_result_limit: Option<usize>,
    pub fusion_algorithm: Option<FusionAlgorithm>,
    pub rrf_constant: Option<f32>,
    pub search_timeout_ms: Option<u64>,
    pub enable_parallel_search: Option<bool>,
    pub cache_results: Option<bool>,
    pub cache_ttl_secs: Option<u64>,
}

impl ConfigUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the fusion algorithm.
    pub fn fusion_algorithm(mut self, algorithm: FusionAlgorithm) -> Self {
        self.fusion_algorithm = Some(algorithm);
        self
    }

    /// Change both source weights.
    pub fn weights(mut self, vector_weight: f32, keyword_weight: f32) -> Self {
        self.vector_weight = Some(vector_weight);
        self.keyword_weight = Some(keyword_weight);
        self
    }

    /// Change the RRF constant.
    pub fn rrf_constant(mut self, k: f32) -> Self {
        self.rrf_constant = Some(k);
        self
    }

    /// Toggle concurrent backend searches.
    pub fn parallel_search(mut self, enable: bool) -> Self {
        self.enable_parallel_search = Some(enable);
        self
    }

    /// Toggle result caching.
    pub fn cache_results(mut self, enable: bool) -> Self {
        self.cache_results = Some(enable);
        self
    }

    /// Change the combined backend deadline.
    pub fn search_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.search_timeout_ms = Some(timeout_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hybrid_query_config_default() {
        let config = HybridQueryConfig::default();
        assert_eq!(config.vector_weight, 0.7);
        assert_eq!(config.keyword_weight, 0.3);
        assert_eq!(config.final_result_limit, 10);
        assert_eq!(config.fusion_algorithm, FusionAlgorithm::Rrf);
        assert_eq!(config.rrf_constant, 60.0);
        assert_eq!(config.search_timeout(), Duration::from_secs(5));
        assert!(config.enable_parallel_search);
        assert!(config.cache_results);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        let config = HybridQueryConfig::default().with_weights(1.0, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(HybridQueryConfig::default().with_weights(1.5, 0.3).validate().is_err());
        assert!(HybridQueryConfig::default().with_weights(0.5, -0.1).validate().is_err());
        assert!(HybridQueryConfig::default().with_final_result_limit(0).validate().is_err());
        assert!(HybridQueryConfig::default().with_final_result_limit(101).validate().is_err());

        let mut config = HybridQueryConfig::default();
        config.rrf_constant = 0.0;
        assert!(config.validate().is_err());

        let config = HybridQueryConfig::default().with_search_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merged_applies_only_set_fields() {
        let config = HybridQueryConfig::default();
        let update = ConfigUpdate::new()
            .fusion_algorithm(FusionAlgorithm::Adaptive)
            .rrf_constant(10.0);

        let next = config.merged(&update).unwrap();
        assert_eq!(next.fusion_algorithm, FusionAlgorithm::Adaptive);
        assert_eq!(next.rrf_constant, 10.0);
        assert_eq!(next.vector_weight, config.vector_weight);
        assert_eq!(next.final_result_limit, config.final_result_limit);
    }

    #[test]
    fn test_merged_rejects_invalid_result() {
        let config = HybridQueryConfig::default();
        let update = ConfigUpdate::new().weights(2.0, 0.3);
        assert!(config.merged(&update).is_err());
    }

    #[test]
    fn test_fusion_algorithm_parse() {
        assert_eq!("rrf".parse::<FusionAlgorithm>().unwrap(), FusionAlgorithm::Rrf);
        assert_eq!(
            " Weighted ".parse::<FusionAlgorithm>().unwrap(),
            FusionAlgorithm::Weighted
        );
        assert_eq!(
            "ADAPTIVE".parse::<FusionAlgorithm>().unwrap(),
            FusionAlgorithm::Adaptive
        );
        assert!("bm25".parse::<FusionAlgorithm>().is_err());
    }

    #[test]
    fn test_from_json_str_uses_defaults() {
        let config =
            HybridQueryConfig::from_json_str(r#"{"fusionAlgorithm":"weighted","vectorWeight":0.5}"#)
                .unwrap();
        assert_eq!(config.fusion_algorithm, FusionAlgorithm::Weighted);
        assert_eq!(config.vector_weight, 0.5);
        assert_eq!(config.keyword_weight, 0.3);

        assert!(HybridQueryConfig::from_json_str(r#"{"keywordWeight":3.0}"#).is_err());
    }
}
