//! In-memory reference backends.
//!
//! [`MemoryVectorIndex`] and [`MemoryKeywordIndex`] implement the backend
//! contracts over documents held in process. They are tenant-scoped and apply
//! filters as exact matches against document metadata. The CLI and the
//! integration tests run on them.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{BraidError, Result};
use crate::hybrid::backend::{
    KeywordSearchService, RawKeywordResult, RawSearchResult, VectorSearchService,
};
use crate::hybrid::search::searcher::{Filters, Metadata};

/// Default output dimension of [`HashingEmbedder`].
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 256;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub tenant_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a new document.
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this document is visible to a tenant under the given filters.
    pub fn matches(&self, tenant_id: &str, filters: &Filters) -> bool {
        self.tenant_id == tenant_id
            && filters
                .iter()
                .all(|(key, value)| self.metadata.get(key) == Some(value))
    }
}

/// Parse a JSONL corpus. Blank lines are skipped.
pub fn parse_corpus(text: &str) -> Result<Vec<Document>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Document>(line).map_err(|e| {
                BraidError::validation(format!("corpus line {}: {e}", i + 1))
            })
        })
        .collect()
}

/// Read a JSONL corpus from disk.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let text = fs::read_to_string(path.as_ref())?;
    let documents = parse_corpus(&text)?;
    debug!(
        "loaded {} documents from {}",
        documents.len(),
        path.as_ref().display()
    );
    Ok(documents)
}

/// Lowercased word tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Turns text into a fixed-size vector.
pub trait QueryEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic feature-hashing embedder.
///
/// Each word is hashed into one of `dimension` buckets and the counts are
/// L2-normalized. Texts sharing words get positive cosine similarity, texts
/// sharing none get zero (up to collisions).
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder with the given output dimension (at least 1).
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(head) % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSION)
    }
}

impl QueryEmbedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity; 0 when either vector has zero norm or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

struct VectorEntry {
    document: Document,
    embedding: Vec<f32>,
}

/// Brute-force cosine search over embedded documents.
pub struct MemoryVectorIndex {
    embedder: Arc<dyn QueryEmbedder>,
    entries: RwLock<Vec<VectorEntry>>,
}

impl MemoryVectorIndex {
    pub fn new(embedder: Arc<dyn QueryEmbedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embed and store a document, replacing any with the same tenant and id.
    pub fn add(&self, document: Document) {
        let embedding = self.embedder.embed(&document.content);
        let mut entries = self.entries.write();
        entries.retain(|e| !(e.document.id == document.id && e.document.tenant_id == document.tenant_id));
        entries.push(VectorEntry {
            document,
            embedding,
        });
    }

    pub fn add_all<I: IntoIterator<Item = Document>>(&self, documents: I) {
        for document in documents {
            self.add(document);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rank(&self, query: &str, tenant_id: &str, filters: &Filters, limit: usize) -> Vec<RawSearchResult> {
        let query_embedding = self.embedder.embed(query);
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = entries
            .iter()
            .filter(|e| e.document.matches(tenant_id, filters))
            .map(|e| (cosine_similarity(&query_embedding, &e.embedding), e))
            .filter(|(similarity, _)| *similarity > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(similarity, e)| {
                RawSearchResult::new(e.document.id.clone(), e.document.content.clone(), similarity)
                    .with_metadata(e.document.metadata.clone())
                    .with_embedding(e.embedding.clone())
            })
            .collect()
    }
}

#[async_trait]
impl VectorSearchService for MemoryVectorIndex {
    async fn search(
        &self,
        query: &str,
        tenant_id: &str,
        filters: &Filters,
        limit: usize,
    ) -> Result<Vec<RawSearchResult>> {
        Ok(self.rank(query, tenant_id, filters, limit))
    }
}

/// Extract search terms from a prefix-OR expression such as `cat:* | sat:*`.
///
/// Plain text (the preparer's fallback) is split into words.
pub fn parse_prefix_query(prepared: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for clause in prepared.split('|') {
        for term in tokenize(clause.trim().trim_end_matches(":*")) {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
    }
    terms
}

struct KeywordEntry {
    document: Document,
    tokens: Vec<String>,
}

/// Prefix-match keyword search.
///
/// A document's score is the fraction of query terms that prefix at least one
/// of its words.
#[derive(Default)]
pub struct MemoryKeywordIndex {
    entries: RwLock<Vec<KeywordEntry>>,
}

impl MemoryKeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize and store a document, replacing any with the same tenant and id.
    pub fn add(&self, document: Document) {
        let tokens = tokenize(&document.content);
        let mut entries = self.entries.write();
        entries.retain(|e| !(e.document.id == document.id && e.document.tenant_id == document.tenant_id));
        entries.push(KeywordEntry { document, tokens });
    }

    pub fn add_all<I: IntoIterator<Item = Document>>(&self, documents: I) {
        for document in documents {
            self.add(document);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rank(
        &self,
        prepared_query: &str,
        tenant_id: &str,
        filters: &Filters,
        limit: usize,
    ) -> Vec<RawKeywordResult> {
        let terms = parse_prefix_query(prepared_query);
        if terms.is_empty() {
            return Vec::new();
        }

        let entries = self.entries.read();
        let mut scored: Vec<(f32, &KeywordEntry)> = entries
            .iter()
            .filter(|e| e.document.matches(tenant_id, filters))
            .filter_map(|e| {
                let matched = terms
                    .iter()
                    .filter(|term| e.tokens.iter().any(|token| token.starts_with(term.as_str())))
                    .count();
                (matched > 0).then(|| (matched as f32 / terms.len() as f32, e))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, e))| {
                RawKeywordResult::new(e.document.id.clone(), e.document.content.clone(), score, i + 1)
                    .with_metadata(e.document.metadata.clone())
            })
            .collect()
    }
}

#[async_trait]
impl KeywordSearchService for MemoryKeywordIndex {
    async fn search(
        &self,
        prepared_query: &str,
        tenant_id: &str,
        filters: &Filters,
        limit: usize,
    ) -> Result<Vec<RawKeywordResult>> {
        Ok(self.rank(prepared_query, tenant_id, filters, limit))
    }
}
