//! # QuickCue Pipeline
//!
//! The retrieval-and-decision core: one transcribed question in, one
//! streamed answer out, always, within the per-stage latency budgets.
//!
//! ```text
//! "Introduce yourself and explain why you want this role"
//!   ↓ Decomposer (≤10s, heuristic split on timeout)
//! ["Introduce yourself", "explain why you want this role"]
//!   ↓ SearchFanout: one task per sub-question, each ≤5s, concurrent
//! RankedMatchSet (deduped by entry_id, ranked by similarity)
//!   ↓ select_stored (single reuse rule, threshold 0.62)
//! stored answer   /   SynthesisEngine streams a generated answer
//!   ↓ resilience chain supervises every stage
//! StoredMatch → CachedGeneration → LiveGeneration → GenericFallback
//! ```
//!
//! Any stage that times out or errors contributes nothing and the chain
//! advances; the generic fallback is the terminal guarantee that the caller
//! always receives an answer and never a hang or a raw error.

pub mod cache;
pub mod decompose;
pub mod detect;
pub mod fanout;
pub mod pipeline;
pub mod resilience;
pub mod select;
pub mod synthesize;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{InMemoryAnswerCache, NoopCache};
pub use decompose::Decomposer;
pub use detect::QuestionKind;
pub use fanout::SearchFanout;
pub use pipeline::{AnswerPipeline, AnswerPipelineBuilder, AnswerStream};
pub use select::select_stored;
pub use synthesize::SynthesisEngine;
