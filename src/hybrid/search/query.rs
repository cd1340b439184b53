//! Query preparation for the keyword path and lightweight query analysis.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::hybrid::search::searcher::SearchStrategy;

/// Tokens of this many characters or fewer are dropped from keyword queries.
pub const MIN_TOKEN_CHARS: usize = 2;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

const INTERROGATIVES: &[&str] = &[
    "who", "what", "when", "where", "why", "which", "how", "can", "could", "does", "do", "is",
    "are", "will", "should",
];

/// Strip punctuation, collapse whitespace, and split into tokens.
fn normalized_tokens(raw: &str) -> Vec<String> {
    let stripped = NON_WORD.replace_all(raw, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed
        .trim()
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn free text into a prefix-OR expression for the keyword backend.
///
/// Tokens of two characters or fewer are dropped; every surviving token
/// becomes a prefix term and the terms are OR'ed. When nothing survives the
/// raw query is returned unchanged so the backend never sees an empty clause.
///
/// # Examples
///
/// ```
/// use braid::hybrid::search::query::prepare_keyword_query;
///
/// assert_eq!(prepare_keyword_query("the cat sat"), "the:* | cat:* | sat:*");
/// assert_eq!(prepare_keyword_query("ab cd"), "ab cd");
/// ```
pub fn prepare_keyword_query(raw: &str) -> String {
    let tokens: Vec<String> = normalized_tokens(raw)
        .into_iter()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .collect();

    if tokens.is_empty() {
        return raw.to_string();
    }

    tokens
        .iter()
        .map(|t| format!("{t}:*"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Coarse shape of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// A natural-language question.
    Question,
    /// One or two bare terms.
    Keyword,
    /// A longer statement.
    Phrase,
}

/// Rough size of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
}

/// Result of [`analyze_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryAnalysis {
    pub query_type: QueryType,
    pub complexity: QueryComplexity,
    pub token_count: usize,
}

/// Classify a query by shape and size.
pub fn analyze_query(raw: &str) -> QueryAnalysis {
    let tokens = normalized_tokens(raw);
    let token_count = tokens.len();

    let first = tokens.first().map(|t| t.to_lowercase());
    let is_question = raw.trim_end().ends_with('?')
        || first
            .as_deref()
            .is_some_and(|w| INTERROGATIVES.contains(&w) && token_count > 1);

    let query_type = if is_question {
        QueryType::Question
    } else if token_count <= 2 {
        QueryType::Keyword
    } else {
        QueryType::Phrase
    };

    let complexity = match token_count {
        0..=3 => QueryComplexity::Simple,
        4..=8 => QueryComplexity::Moderate,
        _ => QueryComplexity::Complex,
    };

    QueryAnalysis {
        query_type,
        complexity,
        token_count,
    }
}

/// Pick the concrete strategy for a request.
///
/// `auto` always runs both paths. A raw-text fallback from
/// [`prepare_keyword_query`] still goes to the keyword backend.
pub fn resolve_strategy(requested: SearchStrategy) -> SearchStrategy {
    match requested {
        SearchStrategy::Auto => SearchStrategy::Hybrid,
        other => other,
    }
}
