//! Shared mock collaborators for pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_stream::wrappers::ReceiverStream;

use quickcue_core::error::{QuickCueError, Result};
use quickcue_core::traits::{
    CompletionProvider, EmbeddingProvider, IndexQuery, TextStream, VectorIndex,
};
use quickcue_core::types::{CompletionRequest, IndexHit, KnowledgeEntry};

// ─── Completion ──────────────────────────────────────────────────────────────

/// Scriptable `CompletionProvider`: canned one-shot text, canned stream
/// chunks, injectable failures and delays, call counters.
#[derive(Clone)]
pub struct MockCompletion {
    completion: Option<String>,
    chunks: Vec<String>,
    stream_error_after: Option<usize>,
    fail_stream_open: bool,
    delay: Option<Duration>,
    pub complete_calls: Arc<AtomicUsize>,
    pub stream_calls: Arc<AtomicUsize>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            completion: Some(String::new()),
            chunks: Vec::new(),
            stream_error_after: None,
            fail_stream_open: false,
            delay: None,
            complete_calls: Arc::new(AtomicUsize::new(0)),
            stream_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_completion(mut self, text: &str) -> Self {
        self.completion = Some(text.to_string());
        self
    }

    /// Every `complete` call errors.
    pub fn failing(mut self) -> Self {
        self.completion = None;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Stream yields `n` chunks then an error.
    pub fn with_stream_error_after(mut self, n: usize) -> Self {
        self.stream_error_after = Some(n);
        self
    }

    /// `complete_stream` itself errors before any chunk.
    pub fn failing_stream_open(mut self) -> Self {
        self.fail_stream_open = true;
        self
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completion
            .clone()
            .ok_or_else(|| QuickCueError::Provider("mock completion failure".into()))
    }

    async fn complete_stream(&self, _request: &CompletionRequest) -> Result<TextStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_stream_open {
            return Err(QuickCueError::Provider("mock stream open failure".into()));
        }

        let chunks = self.chunks.clone();
        let error_after = self.stream_error_after;
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(16);
        tokio::spawn(async move {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if Some(i) == error_after {
                    let _ = tx
                        .send(Err(QuickCueError::Provider("mock mid-stream failure".into())))
                        .await;
                    return;
                }
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
            if error_after.is_some() {
                let _ = tx
                    .send(Err(QuickCueError::Provider("mock mid-stream failure".into())))
                    .await;
            }
        });
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

// ─── Embedding ───────────────────────────────────────────────────────────────

/// Fixed-vocabulary embedder: known texts map to configured vectors, anything
/// else gets the default vector. Per-text delays let fan-out tests model one
/// slow search among fast ones.
#[derive(Clone)]
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default_vector: Vec<f32>,
    delays: HashMap<String, Duration>,
    delay: Option<Duration>,
    failing: bool,
    pub calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new(default_vector: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            default_vector,
            delays: HashMap::new(),
            delay: None,
            failing: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_delay_for(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.default_vector.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.get(text).copied().or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(QuickCueError::Embedding("mock embedding failure".into()));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_vector.clone()))
    }
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// Index whose every search errors.
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _query: &IndexQuery) -> Result<Vec<IndexHit>> {
        Err(QuickCueError::Index("mock index failure".into()))
    }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub fn entry(id: &str, owner: &str, question: &str, answer: &str, embedding: Vec<f32>) -> KnowledgeEntry {
    KnowledgeEntry {
        entry_id: id.into(),
        owner_id: owner.into(),
        question_text: question.into(),
        answer_text: answer.into(),
        embedding,
        category: None,
        alternate_phrasings: vec![],
        usage_count: 0,
    }
}
