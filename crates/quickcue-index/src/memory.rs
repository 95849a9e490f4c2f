//! In-memory cosine-similarity index.
//!
//! Holds `KnowledgeEntry` values directly and ranks them by cosine
//! similarity against the query vector. Used by tests, demos, and the CLI's
//! offline mode; the ranking contract matches the Qdrant client.

use async_trait::async_trait;

use quickcue_core::error::Result;
use quickcue_core::traits::{IndexQuery, VectorIndex};
use quickcue_core::types::{IndexHit, KnowledgeEntry};

#[derive(Default)]
pub struct MemoryIndex {
    entries: Vec<KnowledgeEntry>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: KnowledgeEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>> {
        let mut hits: Vec<IndexHit> = self
            .entries
            .iter()
            .filter(|e| e.owner_id == query.scope.as_str())
            .filter_map(|e| {
                if e.embedding.len() != query.vector.len() {
                    tracing::warn!(
                        "skipping entry {}: embedding dim {} != query dim {}",
                        e.entry_id,
                        e.embedding.len(),
                        query.vector.len()
                    );
                    return None;
                }
                let similarity = cosine_similarity(&query.vector, &e.embedding);
                (similarity >= query.threshold).then(|| IndexHit {
                    entry_id: e.entry_id.clone(),
                    question_text: e.question_text.clone(),
                    answer_text: e.answer_text.clone(),
                    similarity,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(query.limit);
        Ok(hits)
    }
}

/// Cosine similarity of two equal-length vectors, clamped to [0, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}
