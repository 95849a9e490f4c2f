//! Data model of a single question-answer run.
//!
//! Every value here is created when a question enters the pipeline and
//! discarded when its answer stream ends. Persistence of knowledge entries
//! belongs to the external store, not to this core.

use serde::{Deserialize, Serialize};

use crate::error::{QuickCueError, Result};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Opaque, validated user/tenant identifier that scopes every index search.
///
/// Validation happens once at construction; a malformed scope is a contract
/// violation and the only input error the pipeline surfaces to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScope(String);

impl UserScope {
    /// Create a scope from an identifier already validated upstream.
    /// Rejects empty or whitespace-only identifiers.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(QuickCueError::InvalidScope(
                "scope identifier is empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Knowledge base ──────────────────────────────────────────────────────────

/// One pre-authored Q&A record, owned by the external knowledge store.
///
/// `entry_id` is the record's own identity; `owner_id` is the user the record
/// belongs to. They are separate, explicitly-named fields on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub entry_id: String,
    pub owner_id: String,
    pub question_text: String,
    pub answer_text: String,
    /// Fixed-dimension embedding of `question_text`.
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub alternate_phrasings: Vec<String>,
    #[serde(default)]
    pub usage_count: u64,
}

// ─── Decomposition ───────────────────────────────────────────────────────────

/// One atomic fragment of a possibly-compound question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQuestion {
    pub text: String,
    /// Position of this fragment in the decomposition (0-based).
    pub origin_index: usize,
}

impl SubQuestion {
    pub fn new(text: impl Into<String>, origin_index: usize) -> Self {
        Self {
            text: text.into(),
            origin_index,
        }
    }
}

// ─── Search results ──────────────────────────────────────────────────────────

/// Raw hit returned by a vector index for one query.
///
/// Within a single result list, `similarity` is monotonically non-increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub entry_id: String,
    pub question_text: String,
    pub answer_text: String,
    /// Cosine similarity in [0, 1].
    pub similarity: f32,
}

/// An index hit attributed to the sub-question whose search produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub entry_id: String,
    pub question_text: String,
    pub answer_text: String,
    pub similarity: f32,
    /// `origin_index` of the sub-question that retrieved this hit.
    pub source_subquestion: usize,
}

impl SearchMatch {
    pub fn from_hit(hit: IndexHit, source_subquestion: usize) -> Self {
        Self {
            entry_id: hit.entry_id,
            question_text: hit.question_text,
            answer_text: hit.answer_text,
            similarity: hit.similarity,
            source_subquestion,
        }
    }
}

/// Deduplicated, ranked union of all matches across sub-question searches.
///
/// Invariants: no two elements share `entry_id`; elements are sorted by
/// similarity descending, ties broken by sub-question origin order then
/// `entry_id` so the merge is deterministic for any task completion order.
#[derive(Debug, Clone, Default)]
pub struct RankedMatchSet {
    matches: Vec<SearchMatch>,
}

impl RankedMatchSet {
    /// Merge per-sub-question result batches into one ranked set.
    ///
    /// Duplicate `entry_id`s keep the highest similarity seen (on equal
    /// similarity, the earliest sub-question wins). The result is capped to
    /// `max_results`.
    pub fn merge(batches: impl IntoIterator<Item = Vec<SearchMatch>>, max_results: usize) -> Self {
        let mut by_id: std::collections::HashMap<String, SearchMatch> =
            std::collections::HashMap::new();

        for batch in batches {
            for m in batch {
                match by_id.get(&m.entry_id) {
                    Some(existing)
                        if existing.similarity > m.similarity
                            || (existing.similarity == m.similarity
                                && existing.source_subquestion <= m.source_subquestion) => {}
                    _ => {
                        by_id.insert(m.entry_id.clone(), m);
                    }
                }
            }
        }

        let mut matches: Vec<SearchMatch> = by_id.into_values().collect();
        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.source_subquestion.cmp(&b.source_subquestion))
                .then(a.entry_id.cmp(&b.entry_id))
        });
        matches.truncate(max_results);

        Self { matches }
    }

    /// Highest-similarity match, if any.
    pub fn best(&self) -> Option<&SearchMatch> {
        self.matches.first()
    }

    /// Top `n` matches in rank order.
    pub fn top(&self, n: usize) -> &[SearchMatch] {
        &self.matches[..self.matches.len().min(n)]
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchMatch> {
        self.matches.iter()
    }
}

// ─── Answer output ───────────────────────────────────────────────────────────

/// Where the final answer text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// A stored answer reused verbatim.
    Stored,
    /// Generated from retrieved context (live or cached generation).
    Synthesized,
    /// The pre-defined safe fallback.
    Generic,
}

/// Pipeline stages, in the order the resilience chain visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decompose,
    Search,
    StoredMatch,
    CachedGeneration,
    LiveGeneration,
    GenericFallback,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Decompose => "decompose",
            Stage::Search => "search",
            Stage::StoredMatch => "stored_match",
            Stage::CachedGeneration => "cached_generation",
            Stage::LiveGeneration => "live_generation",
            Stage::GenericFallback => "generic_fallback",
        };
        write!(f, "{s}")
    }
}

/// Wall-clock time one stage spent before yielding or advancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLatency {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

/// Terminal output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
    pub source: AnswerSource,
    /// `entry_id`s of the matches that shaped the answer (stored answer or
    /// synthesis context). The session layer uses these for usage accounting.
    pub matches_used: Vec<String>,
    pub stage_latencies: Vec<StageLatency>,
}

/// One event on the answer stream.
///
/// A second `StreamStart` supersedes an earlier one: when live generation
/// fails mid-stream the chain restarts output from the next stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
    StreamStart { source: AnswerSource },
    Chunk { text: String },
    StreamEnd { result: AnswerResult },
}

// ─── Completion requests ─────────────────────────────────────────────────────

/// Prompt pair handed to a completion provider.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}
