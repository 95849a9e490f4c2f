//! Stage accounting for the fallback chain.
//!
//! The chain itself lives in [`crate::pipeline`]; this module holds the
//! pieces it reports with: per-stage latency recording and the choice of
//! terminal generic answer.

use std::time::Instant;

use quickcue_core::config::ResilienceConfig;
use quickcue_core::types::{Stage, StageLatency};

use crate::detect::QuestionKind;

/// Collects wall-clock latency per visited stage, in visit order.
#[derive(Default)]
pub struct StageRecorder {
    latencies: Vec<StageLatency>,
}

impl StageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `stage` ran from `started` until now.
    pub fn record(&mut self, stage: Stage, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::debug!("stage {stage} finished in {elapsed_ms}ms");
        self.latencies.push(StageLatency { stage, elapsed_ms });
    }

    pub fn into_latencies(self) -> Vec<StageLatency> {
        self.latencies
    }
}

/// Terminal safe answer: the operator-configured text when set, otherwise a
/// built-in line matched to the question's kind.
pub fn generic_answer(config: &ResilienceConfig, question: &str) -> String {
    if config.generic_answer.trim().is_empty() {
        QuestionKind::classify(question).fallback_line().to_string()
    } else {
        config.generic_answer.clone()
    }
}
