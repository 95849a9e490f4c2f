//! The answer pipeline and its fallback chain.
//!
//! `answer` drives one question through decompose → search → the four-stage
//! chain (stored match, cached generation, live generation, generic
//! fallback) and streams [`AnswerEvent`]s to the caller. Each stage either
//! produces the answer or yields to the next; the generic fallback always
//! produces one, so the stream always terminates with a `StreamEnd` and the
//! caller never sees a hang or a raw error.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use quickcue_core::config::{QuickCueConfig, ResilienceConfig, RetrievalConfig};
use quickcue_core::error::{QuickCueError, Result};
use quickcue_core::traits::{AnswerCache, CompletionProvider, EmbeddingProvider, VectorIndex};
use quickcue_core::types::{
    AnswerEvent, AnswerResult, AnswerSource, RankedMatchSet, Stage, UserScope,
};

use crate::cache::NoopCache;
use crate::decompose::Decomposer;
use crate::fanout::SearchFanout;
use crate::resilience::{StageRecorder, generic_answer};
use crate::select::select_stored;
use crate::synthesize::SynthesisEngine;

/// Event stream for one question. Always finite, always ends with
/// [`AnswerEvent::StreamEnd`]. Dropping it cancels any in-flight work.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AnswerEvent> + Send>>;

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct AnswerPipelineBuilder {
    config: QuickCueConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    completion: Option<Arc<dyn CompletionProvider>>,
    cache: Option<Arc<dyn AnswerCache>>,
}

impl AnswerPipelineBuilder {
    pub fn new(config: QuickCueConfig) -> Self {
        Self {
            config,
            embedder: None,
            index: None,
            completion: None,
            cache: None,
        }
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn completion(mut self, completion: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn AnswerCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Assemble the pipeline. Fails loudly if a required collaborator is
    /// missing; the cache alone is optional and defaults to no caching.
    pub fn build(self) -> Result<AnswerPipeline> {
        let missing = |what: &str| QuickCueError::Config(format!("pipeline {what} is not set"));
        let embedder = self.embedder.ok_or_else(|| missing("embedding provider"))?;
        let index = self.index.ok_or_else(|| missing("vector index"))?;
        let completion = self.completion.ok_or_else(|| missing("completion provider"))?;
        let cache = self.cache.unwrap_or_else(|| Arc::new(NoopCache));

        Ok(AnswerPipeline {
            decomposer: Decomposer::new(Arc::clone(&completion), self.config.decompose.clone()),
            fanout: SearchFanout::new(embedder, index, self.config.retrieval.clone()),
            synthesis: SynthesisEngine::new(completion, self.config.retrieval.context_matches),
            cache,
            retrieval: self.config.retrieval,
            resilience: self.config.resilience,
        })
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AnswerPipeline {
    decomposer: Decomposer,
    fanout: SearchFanout,
    synthesis: SynthesisEngine,
    cache: Arc<dyn AnswerCache>,
    retrieval: RetrievalConfig,
    resilience: ResilienceConfig,
}

impl std::fmt::Debug for AnswerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerPipeline")
            .field("retrieval", &self.retrieval)
            .field("resilience", &self.resilience)
            .finish_non_exhaustive()
    }
}

impl AnswerPipeline {
    pub fn builder(config: QuickCueConfig) -> AnswerPipelineBuilder {
        AnswerPipelineBuilder::new(config)
    }

    /// Answer one question as a stream of events.
    pub fn answer(&self, question: &str, scope: &UserScope) -> AnswerStream {
        let (tx, rx) = mpsc::channel(32);
        let pipeline = self.clone();
        let question = question.to_string();
        let scope = scope.clone();
        tokio::spawn(async move {
            pipeline.drive(question, scope, tx).await;
        });
        Box::pin(ReceiverStream::new(rx))
    }

    /// Answer one question and return only the terminal result.
    pub async fn answer_once(&self, question: &str, scope: &UserScope) -> AnswerResult {
        let mut stream = self.answer(question, scope);
        let mut last = None;
        while let Some(event) = stream.next().await {
            if let AnswerEvent::StreamEnd { result } = event {
                last = Some(result);
            }
        }
        // The driver always sends a StreamEnd; this covers a panicked task.
        last.unwrap_or_else(|| AnswerResult {
            text: generic_answer(&self.resilience, question),
            source: AnswerSource::Generic,
            matches_used: Vec::new(),
            stage_latencies: Vec::new(),
        })
    }

    async fn drive(self, question: String, scope: UserScope, tx: mpsc::Sender<AnswerEvent>) {
        let mut recorder = StageRecorder::new();

        let started = Instant::now();
        let subs = self.decomposer.decompose(&question).await;
        recorder.record(Stage::Decompose, started);

        let started = Instant::now();
        let matches = self.fanout.search(&subs, &scope).await;
        recorder.record(Stage::Search, started);

        // Stage 1: stored match, reused verbatim.
        let started = Instant::now();
        let stored = select_stored(&matches, self.retrieval.reuse_threshold)
            .map(|m| (m.answer_text.clone(), m.entry_id.clone()));
        recorder.record(Stage::StoredMatch, started);
        if let Some((text, entry_id)) = stored {
            emit_whole(&tx, AnswerSource::Stored, text, vec![entry_id], recorder).await;
            return;
        }

        // Stage 2: previously generated answer for the same question.
        let started = Instant::now();
        let cached = self.cache.lookup(&question, &scope).await;
        recorder.record(Stage::CachedGeneration, started);
        if let Some(text) = cached {
            emit_whole(&tx, AnswerSource::Synthesized, text, Vec::new(), recorder).await;
            return;
        }

        // Stage 3: live grounded generation, streamed as it arrives.
        let started = Instant::now();
        match self.live_generation(&question, &matches, &tx).await {
            Ok(Some(full_text)) => {
                recorder.record(Stage::LiveGeneration, started);
                self.cache.store(&question, &scope, &full_text).await;
                let matches_used = matches
                    .top(self.retrieval.context_matches)
                    .iter()
                    .map(|m| m.entry_id.clone())
                    .collect();
                let result = AnswerResult {
                    text: full_text,
                    source: AnswerSource::Synthesized,
                    matches_used,
                    stage_latencies: recorder.into_latencies(),
                };
                let _ = tx.send(AnswerEvent::StreamEnd { result }).await;
                return;
            }
            Ok(None) => return, // consumer dropped the stream
            Err(e) => {
                tracing::warn!("live generation failed ({e}), falling back");
                recorder.record(Stage::LiveGeneration, started);
            }
        }

        // Stage 4: terminal safe answer. Cannot fail.
        let started = Instant::now();
        let text = generic_answer(&self.resilience, &question);
        recorder.record(Stage::GenericFallback, started);
        emit_whole(&tx, AnswerSource::Generic, text, Vec::new(), recorder).await;
    }

    /// Run one live generation under the whole-stream budget.
    ///
    /// `Ok(Some(text))` is the accumulated full answer, already streamed to
    /// `tx` chunk by chunk. `Ok(None)` means the consumer went away. Any
    /// error or timeout leaves the caller to advance the chain; a second
    /// `StreamStart` from the next stage supersedes whatever partial output
    /// this stage emitted.
    async fn live_generation(
        &self,
        question: &str,
        matches: &RankedMatchSet,
        tx: &mpsc::Sender<AnswerEvent>,
    ) -> Result<Option<String>> {
        let budget_secs = self.resilience.generation_timeout_secs;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(budget_secs);
        let timed_out = || QuickCueError::StageTimeout {
            stage: Stage::LiveGeneration.to_string(),
            budget_secs,
        };

        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let mut stream =
            tokio::time::timeout(remaining, self.synthesis.synthesize(question, matches))
                .await
                .map_err(|_| timed_out())??;

        let mut full = String::new();
        let mut announced = false;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let next = tokio::time::timeout(remaining, stream.next())
                .await
                .map_err(|_| timed_out())?;
            match next {
                Some(Ok(chunk)) => {
                    if !announced {
                        announced = true;
                        let start = AnswerEvent::StreamStart {
                            source: AnswerSource::Synthesized,
                        };
                        if tx.send(start).await.is_err() {
                            return Ok(None);
                        }
                    }
                    full.push_str(&chunk);
                    if tx.send(AnswerEvent::Chunk { text: chunk }).await.is_err() {
                        return Ok(None);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        if full.trim().is_empty() {
            return Err(QuickCueError::Synthesis("generation produced no text".into()));
        }
        Ok(Some(full))
    }
}

/// Emit a complete answer as the standard start/chunk/end triple.
async fn emit_whole(
    tx: &mpsc::Sender<AnswerEvent>,
    source: AnswerSource,
    text: String,
    matches_used: Vec<String>,
    recorder: StageRecorder,
) {
    if tx.send(AnswerEvent::StreamStart { source }).await.is_err() {
        return;
    }
    let chunk = AnswerEvent::Chunk { text: text.clone() };
    if tx.send(chunk).await.is_err() {
        return;
    }
    let result = AnswerResult {
        text,
        source,
        matches_used,
        stage_latencies: recorder.into_latencies(),
    };
    let _ = tx.send(AnswerEvent::StreamEnd { result }).await;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryAnswerCache;
    use crate::testutil::{FailingIndex, MockCompletion, MockEmbedder, entry};
    use quickcue_index::MemoryIndex;
    use std::sync::atomic::Ordering;

    const INTRO_Q: &str = "Tell me about yourself";
    const INTRO_A: &str = "I'm a backend engineer with eight years in distributed systems.";

    fn knowledge_index() -> Arc<MemoryIndex> {
        Arc::new(MemoryIndex::with_entries(vec![entry(
            "intro",
            "u1",
            INTRO_Q,
            INTRO_A,
            vec![1.0, 0.0, 0.0],
        )]))
    }

    fn scope() -> UserScope {
        UserScope::new("u1").unwrap()
    }

    /// Embedder whose default vector sits at a chosen cosine similarity to
    /// the stored "intro" entry.
    fn embedder_at(similarity: f32) -> Arc<MockEmbedder> {
        let y = (1.0 - similarity * similarity).sqrt();
        Arc::new(MockEmbedder::new(vec![similarity, y, 0.0]))
    }

    fn pipeline(
        embedder: Arc<MockEmbedder>,
        index: Arc<dyn VectorIndex>,
        completion: MockCompletion,
    ) -> AnswerPipeline {
        AnswerPipeline::builder(QuickCueConfig::default())
            .embedder(embedder)
            .index(index)
            .completion(Arc::new(completion))
            .build()
            .unwrap()
    }

    async fn collect(mut stream: AnswerStream) -> Vec<AnswerEvent> {
        let mut events = Vec::new();
        while let Some(e) = stream.next().await {
            events.push(e);
        }
        events
    }

    fn end_result(events: &[AnswerEvent]) -> &AnswerResult {
        match events.last().unwrap() {
            AnswerEvent::StreamEnd { result } => result,
            other => panic!("expected StreamEnd, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = AnswerPipeline::builder(QuickCueConfig::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("embedding provider"));
    }

    #[tokio::test]
    async fn test_exact_match_reuses_stored_answer_verbatim() {
        let completion = MockCompletion::new().with_completion(INTRO_Q);
        let stream_calls = completion.stream_calls.clone();
        let p = pipeline(embedder_at(1.0), knowledge_index(), completion);

        let events = collect(p.answer(INTRO_Q, &scope())).await;
        assert!(matches!(
            events[0],
            AnswerEvent::StreamStart { source: AnswerSource::Stored }
        ));
        assert!(matches!(&events[1], AnswerEvent::Chunk { text } if text == INTRO_A));

        let result = end_result(&events);
        assert_eq!(result.source, AnswerSource::Stored);
        assert_eq!(result.text, INTRO_A);
        assert_eq!(result.matches_used, vec!["intro".to_string()]);
        // Stored reuse never touches the generator
        assert_eq!(stream_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_paraphrase_reused() {
        let completion = MockCompletion::new().with_completion("Describe your background");
        let p = pipeline(embedder_at(0.686), knowledge_index(), completion);

        let result = p.answer_once("Describe your background", &scope()).await;
        assert_eq!(result.source, AnswerSource::Stored);
        assert_eq!(result.text, INTRO_A);
    }

    #[tokio::test]
    async fn test_weak_match_synthesizes_with_context() {
        let completion = MockCompletion::new()
            .with_completion("What drives you at work")
            .with_chunks(&["I care about reliability. ", "It shows in my work."]);
        let p = pipeline(embedder_at(0.61), knowledge_index(), completion);

        let events = collect(p.answer("What drives you at work", &scope())).await;
        assert!(matches!(
            events[0],
            AnswerEvent::StreamStart { source: AnswerSource::Synthesized }
        ));
        let chunk_count = events
            .iter()
            .filter(|e| matches!(e, AnswerEvent::Chunk { .. }))
            .count();
        assert!(chunk_count >= 2);

        let result = end_result(&events);
        assert_eq!(result.source, AnswerSource::Synthesized);
        assert_eq!(result.text, "I care about reliability. It shows in my work.");
        // The weak match still grounded the generation
        assert_eq!(result.matches_used, vec!["intro".to_string()]);
    }

    #[tokio::test]
    async fn test_search_failure_still_synthesizes() {
        let completion = MockCompletion::new()
            .with_completion("q")
            .with_chunks(&["Generated without any context."]);
        let p = pipeline(embedder_at(1.0), Arc::new(FailingIndex), completion);

        let result = p.answer_once("Anything at all here", &scope()).await;
        assert_eq!(result.source, AnswerSource::Synthesized);
        assert!(result.matches_used.is_empty());
    }

    #[tokio::test]
    async fn test_everything_failing_yields_generic() {
        let completion = MockCompletion::new().failing().failing_stream_open();
        let p = pipeline(embedder_at(1.0), Arc::new(FailingIndex), completion);

        let events = collect(p.answer("Tell me about a time you failed", &scope())).await;
        let result = end_result(&events);
        assert_eq!(result.source, AnswerSource::Generic);
        assert!(!result.text.is_empty());

        let stages: Vec<Stage> = result.stage_latencies.iter().map(|l| l.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Decompose,
                Stage::Search,
                Stage::StoredMatch,
                Stage::CachedGeneration,
                Stage::LiveGeneration,
                Stage::GenericFallback,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_generation_yields_generic() {
        // Stream opens fine but produces zero chunks
        let completion = MockCompletion::new().with_completion("q");
        let p = pipeline(embedder_at(0.0), knowledge_index(), completion);

        let result = p.answer_once("Unrelated question entirely", &scope()).await;
        assert_eq!(result.source, AnswerSource::Generic);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_superseded_by_generic() {
        let completion = MockCompletion::new()
            .with_completion("q")
            .with_chunks(&["A first sentence. And then it"])
            .with_stream_error_after(1);
        let p = pipeline(embedder_at(0.0), knowledge_index(), completion);

        let events = collect(p.answer("Unrelated question entirely", &scope())).await;
        let starts: Vec<AnswerSource> = events
            .iter()
            .filter_map(|e| match e {
                AnswerEvent::StreamStart { source } => Some(*source),
                _ => None,
            })
            .collect();
        // Partial synthesized output, then the fallback restarts the stream
        assert_eq!(starts, vec![AnswerSource::Synthesized, AnswerSource::Generic]);
        assert_eq!(end_result(&events).source, AnswerSource::Generic);
    }

    #[tokio::test]
    async fn test_cached_generation_skips_live_call() {
        let completion = MockCompletion::new()
            .with_completion("q")
            .failing_stream_open();
        let stream_calls = completion.stream_calls.clone();
        let cache = Arc::new(InMemoryAnswerCache::new(16));
        cache
            .store("Unrelated question entirely", &scope(), "the cached answer")
            .await;

        let p = AnswerPipeline::builder(QuickCueConfig::default())
            .embedder(embedder_at(0.0))
            .index(knowledge_index())
            .completion(Arc::new(completion))
            .cache(cache)
            .build()
            .unwrap();

        let result = p.answer_once("Unrelated question entirely", &scope()).await;
        assert_eq!(result.source, AnswerSource::Synthesized);
        assert_eq!(result.text, "the cached answer");
        assert_eq!(stream_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_result_is_cached_for_next_run() {
        let completion = MockCompletion::new()
            .with_completion("q")
            .with_chunks(&["Answer body."]);
        let stream_calls = completion.stream_calls.clone();
        let cache = Arc::new(InMemoryAnswerCache::new(16));

        let p = AnswerPipeline::builder(QuickCueConfig::default())
            .embedder(embedder_at(0.0))
            .index(knowledge_index())
            .completion(Arc::new(completion))
            .cache(cache)
            .build()
            .unwrap();

        let first = p.answer_once("Unrelated question entirely", &scope()).await;
        let second = p.answer_once("unrelated QUESTION entirely?", &scope()).await;
        assert_eq!(first.text, second.text);
        assert_eq!(second.source, AnswerSource::Synthesized);
        assert_eq!(stream_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_generation_cut_off_at_budget() {
        // complete() stalls past the 10s decompose budget and
        // complete_stream() stalls past the 30s generation budget
        let completion = MockCompletion::new()
            .with_completion("q")
            .with_chunks(&["never arrives"])
            .with_delay(Duration::from_secs(120));
        let p = pipeline(embedder_at(0.0), knowledge_index(), completion);

        let started = tokio::time::Instant::now();
        let result = p.answer_once("Unrelated question entirely", &scope()).await;
        assert_eq!(result.source, AnswerSource::Generic);
        // 10s decompose budget + 30s generation budget, plus slack
        assert!(started.elapsed() < Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_source_classification_is_idempotent() {
        let completion = MockCompletion::new().with_completion(INTRO_Q);
        let p = pipeline(embedder_at(1.0), knowledge_index(), completion);

        let first = p.answer_once(INTRO_Q, &scope()).await;
        let second = p.answer_once(INTRO_Q, &scope()).await;
        assert_eq!(first.source, second.source);
        assert_eq!(first.text, second.text);
        assert_eq!(first.matches_used, second.matches_used);
    }

    #[tokio::test]
    async fn test_compound_question_heuristic_decomposition_reaches_both_entries() {
        let index = Arc::new(MemoryIndex::with_entries(vec![
            entry("intro", "u1", INTRO_Q, INTRO_A, vec![1.0, 0.0, 0.0]),
            entry("why", "u1", "Why this role?", "Because it fits.", vec![0.0, 1.0, 0.0]),
        ]));
        let embedder = Arc::new(
            MockEmbedder::new(vec![0.0, 0.0, 1.0])
                .with_vector("Introduce yourself", vec![1.0, 0.0, 0.0])
                .with_vector("why do you want this role", vec![0.0, 1.0, 0.0]),
        );
        // Decomposition call fails so the conjunction split must kick in
        let completion = MockCompletion::new()
            .failing()
            .with_chunks(&["Combined answer."]);
        let p = pipeline(embedder, index, completion);

        let result = p
            .answer_once("Introduce yourself and why do you want this role", &scope())
            .await;
        // Both sub-questions hit exactly; the merged best (earliest origin
        // on the similarity tie) is reused
        assert_eq!(result.source, AnswerSource::Stored);
        assert_eq!(result.text, INTRO_A);
        assert_eq!(result.matches_used, vec!["intro".to_string()]);
    }
}
