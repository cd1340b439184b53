//! Fusion scoring for hybrid search.
//!
//! Each candidate carries an optional score and an optional 1-based rank per
//! retrieval path. A missing path contributes nothing to the fused score.

use serde::{Deserialize, Serialize};

use crate::hybrid::config::{FusionAlgorithm, HybridQueryConfig};

/// Share of the weighted score in the adaptive blend.
pub const ADAPTIVE_WEIGHTED_SHARE: f32 = 0.7;
/// Share of the RRF score in the adaptive blend.
pub const ADAPTIVE_RRF_SHARE: f32 = 0.3;

/// Per-source evidence for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceEvidence {
    pub vector_score: Option<f32>,
    pub keyword_score: Option<f32>,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
}

/// The parameters fusion depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionParams {
    pub algorithm: FusionAlgorithm,
    pub vector_weight: f32,
    pub keyword_weight: f32,
    pub rrf_constant: f32,
}

impl From<&HybridQueryConfig> for FusionParams {
    fn from(config: &HybridQueryConfig) -> Self {
        Self {
            algorithm: config.fusion_algorithm,
            vector_weight: config.vector_weight,
            keyword_weight: config.keyword_weight,
            rrf_constant: config.rrf_constant,
        }
    }
}

impl Default for FusionParams {
    fn default() -> Self {
        FusionParams::from(&HybridQueryConfig::default())
    }
}

/// Computes fused scores under a fixed set of parameters.
///
/// # Examples
///
/// ```
/// use braid::hybrid::config::FusionAlgorithm;
/// use braid::hybrid::search::scorer::{FusionParams, FusionScorer, SourceEvidence};
///
/// let scorer = FusionScorer::new(FusionParams {
///     algorithm: FusionAlgorithm::Weighted,
///     vector_weight: 0.7,
///     keyword_weight: 0.3,
///     rrf_constant: 60.0,
/// });
/// let evidence = SourceEvidence {
///     vector_score: Some(0.5),
///     keyword_score: Some(0.8),
///     vector_rank: Some(2),
///     keyword_rank: Some(1),
/// };
/// assert!((scorer.score(&evidence) - 0.59).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FusionScorer {
    params: FusionParams,
}

impl FusionScorer {
    /// Create a new scorer.
    pub fn new(params: FusionParams) -> Self {
        Self { params }
    }

    /// Fused score for one candidate under the configured algorithm.
    pub fn score(&self, evidence: &SourceEvidence) -> f32 {
        match self.params.algorithm {
            FusionAlgorithm::Weighted => self.weighted(evidence),
            FusionAlgorithm::Rrf => self.reciprocal_rank(evidence),
            FusionAlgorithm::Adaptive => self.adaptive(evidence),
        }
    }

    /// `min(v,1)*wv + min(k,1)*wk`.
    pub fn weighted(&self, evidence: &SourceEvidence) -> f32 {
        let vector = evidence.vector_score.map_or(0.0, |s| s.min(1.0));
        let keyword = evidence.keyword_score.map_or(0.0, |s| s.min(1.0));
        vector * self.params.vector_weight + keyword * self.params.keyword_weight
    }

    /// `Σ 1/(k + rank)` over the sources that returned the candidate.
    pub fn reciprocal_rank(&self, evidence: &SourceEvidence) -> f32 {
        let k = self.params.rrf_constant;
        [evidence.vector_rank, evidence.keyword_rank]
            .into_iter()
            .flatten()
            .map(|rank| 1.0 / (k + rank as f32))
            .sum()
    }

    /// Fixed blend of the weighted and RRF scores.
    pub fn adaptive(&self, evidence: &SourceEvidence) -> f32 {
        ADAPTIVE_WEIGHTED_SHARE * self.weighted(evidence)
            + ADAPTIVE_RRF_SHARE * self.reciprocal_rank(evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer(algorithm: FusionAlgorithm) -> FusionScorer {
        FusionScorer::new(FusionParams {
            algorithm,
            vector_weight: 0.7,
            keyword_weight: 0.3,
            rrf_constant: 60.0,
        })
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_weighted_missing_source_contributes_zero() {
        let s = scorer(FusionAlgorithm::Weighted);
        let only_keyword = SourceEvidence {
            keyword_score: Some(0.3),
            keyword_rank: Some(2),
            ..Default::default()
        };
        assert!(approx(s.score(&only_keyword), 0.09));
    }

    #[test]
    fn test_weighted_clamps_scores_above_one() {
        let s = scorer(FusionAlgorithm::Weighted);
        let evidence = SourceEvidence {
            vector_score: Some(0.5),
            keyword_score: Some(12.5),
            vector_rank: Some(1),
            keyword_rank: Some(1),
        };
        assert!(approx(s.score(&evidence), 0.35 + 0.3));
    }

    #[test]
    fn test_rrf_sums_present_ranks() {
        let s = scorer(FusionAlgorithm::Rrf);
        let both = SourceEvidence {
            vector_rank: Some(1),
            keyword_rank: Some(2),
            ..Default::default()
        };
        assert!(approx(s.score(&both), 1.0 / 61.0 + 1.0 / 62.0));

        let one = SourceEvidence {
            vector_rank: Some(3),
            ..Default::default()
        };
        assert!(approx(s.score(&one), 1.0 / 63.0));
    }

    #[test]
    fn test_rrf_ignores_raw_scores() {
        let s = scorer(FusionAlgorithm::Rrf);
        let low = SourceEvidence {
            vector_score: Some(0.01),
            vector_rank: Some(1),
            ..Default::default()
        };
        let high = SourceEvidence {
            vector_score: Some(0.99),
            vector_rank: Some(1),
            ..Default::default()
        };
        assert_eq!(s.score(&low), s.score(&high));
    }

    #[test]
    fn test_rrf_monotonic_in_vector_rank() {
        let s = scorer(FusionAlgorithm::Rrf);
        for keyword_rank in [None, Some(1), Some(7)] {
            for better in 1..20 {
                let a = SourceEvidence {
                    vector_rank: Some(better),
                    keyword_rank,
                    ..Default::default()
                };
                let b = SourceEvidence {
                    vector_rank: Some(better + 1),
                    keyword_rank,
                    ..Default::default()
                };
                assert!(s.score(&a) >= s.score(&b));
            }
        }
    }

    #[test]
    fn test_adaptive_is_fixed_blend() {
        let s = scorer(FusionAlgorithm::Adaptive);
        let evidence = SourceEvidence {
            vector_score: Some(0.9),
            keyword_score: None,
            vector_rank: Some(1),
            keyword_rank: None,
        };
        let expected = 0.7 * (0.9 * 0.7) + 0.3 * (1.0 / 61.0);
        assert!(approx(s.score(&evidence), expected));
    }

    #[test]
    fn test_params_from_config() {
        let config = HybridQueryConfig::default().with_fusion_algorithm(FusionAlgorithm::Adaptive);
        let params = FusionParams::from(&config);
        assert_eq!(params.algorithm, FusionAlgorithm::Adaptive);
        assert_eq!(params.vector_weight, 0.7);
        assert_eq!(params.rrf_constant, 60.0);
    }
}
