//! Answer cache for repeated generations.
//!
//! Questions recur within a session with trivial phrasing drift, so cache
//! keys are normalized (case, whitespace, trailing punctuation) and scoped
//! per user. The cache is best-effort by contract: lookups and stores never
//! fail the pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quickcue_core::traits::AnswerCache;
use quickcue_core::types::UserScope;

/// Cache that never hits; the default when no cache is configured.
pub struct NoopCache;

#[async_trait]
impl AnswerCache for NoopCache {
    async fn lookup(&self, _question: &str, _scope: &UserScope) -> Option<String> {
        None
    }

    async fn store(&self, _question: &str, _scope: &UserScope, _answer: &str) {}
}

/// Session-lifetime in-memory cache of generated answers.
pub struct InMemoryAnswerCache {
    max_entries: usize,
    entries: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryAnswerCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl AnswerCache for InMemoryAnswerCache {
    async fn lookup(&self, question: &str, scope: &UserScope) -> Option<String> {
        let key = (scope.as_str().to_string(), normalize_question(question));
        self.entries.read().await.get(&key).cloned()
    }

    async fn store(&self, question: &str, scope: &UserScope, answer: &str) {
        let key = (scope.as_str().to_string(), normalize_question(question));
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            // Session-style reset rather than per-entry eviction
            tracing::debug!("answer cache full ({} entries), clearing", entries.len());
            entries.clear();
        }
        entries.insert(key, answer.to_string());
    }
}

/// Canonical cache-key form: lowercase, whitespace collapsed, trailing
/// punctuation stripped.
pub fn normalize_question(question: &str) -> String {
    let collapsed = question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .trim_end_matches(['?', '.', '!', ' '])
        .to_string()
}
