//! Result merging for hybrid search.
//!
//! [`FusionEngine`] merges the vector and keyword lists by document id, scores
//! every distinct candidate with a [`FusionScorer`], and returns one ranked,
//! deduplicated list.

use ahash::AHashMap;

use crate::hybrid::backend::{RawKeywordResult, RawSearchResult};
use crate::hybrid::search::scorer::{FusionParams, FusionScorer, SourceEvidence};
use crate::hybrid::search::searcher::FusedResult;

/// Output of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    /// Ranked and truncated results.
    pub results: Vec<FusedResult>,
    /// Distinct candidates before truncation.
    pub candidates: usize,
}

/// Merges vector and keyword results into a single ranking.
pub struct FusionEngine {
    scorer: FusionScorer,
}

impl FusionEngine {
    /// Create a new fusion engine.
    pub fn new(params: FusionParams) -> Self {
        Self {
            scorer: FusionScorer::new(params),
        }
    }

    /// Fuse two ranked lists and keep the best `limit` results.
    pub fn fuse(
        &self,
        vector_results: &[RawSearchResult],
        keyword_results: &[RawKeywordResult],
        limit: usize,
    ) -> Vec<FusedResult> {
        self.fuse_with_counts(vector_results, keyword_results, limit)
            .results
    }

    /// Like [`fuse`](Self::fuse), also reporting the candidate count.
    ///
    /// Ranks are 1-based positions in each input list. When an id repeats
    /// within one list its first occurrence wins. Candidates are enumerated
    /// in vector order, then keyword-only ids in keyword order, and that
    /// order breaks score ties.
    pub fn fuse_with_counts(
        &self,
        vector_results: &[RawSearchResult],
        keyword_results: &[RawKeywordResult],
        limit: usize,
    ) -> FusionOutcome {
        let mut order: Vec<&str> = Vec::with_capacity(vector_results.len() + keyword_results.len());

        let mut vector_map: AHashMap<&str, (&RawSearchResult, usize)> = AHashMap::new();
        for (i, result) in vector_results.iter().enumerate() {
            if !vector_map.contains_key(result.id.as_str()) {
                vector_map.insert(result.id.as_str(), (result, i + 1));
                order.push(result.id.as_str());
            }
        }

        let mut keyword_map: AHashMap<&str, (&RawKeywordResult, usize)> = AHashMap::new();
        for (i, result) in keyword_results.iter().enumerate() {
            if !keyword_map.contains_key(result.id.as_str()) {
                keyword_map.insert(result.id.as_str(), (result, i + 1));
                if !vector_map.contains_key(result.id.as_str()) {
                    order.push(result.id.as_str());
                }
            }
        }

        let candidates = order.len();

        let mut merged: Vec<FusedResult> = order
            .into_iter()
            .filter_map(|id| {
                let vector = vector_map.get(id).copied();
                let keyword = keyword_map.get(id).copied();

                let evidence = SourceEvidence {
                    vector_score: vector.map(|(r, _)| r.similarity),
                    keyword_score: keyword.map(|(r, _)| r.score),
                    vector_rank: vector.map(|(_, rank)| rank),
                    keyword_rank: keyword.map(|(_, rank)| rank),
                };

                FusedResult::assemble(vector, keyword, self.scorer.score(&evidence))
            })
            .collect();

        // Stable sort, so equal scores keep enumeration order
        merged.sort_by(|a, b| b.fusion_score.total_cmp(&a.fusion_score));
        merged.truncate(limit);

        FusionOutcome {
            results: merged,
            candidates,
        }
    }
}
