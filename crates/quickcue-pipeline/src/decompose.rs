//! Question decomposition.
//!
//! Compound questions ("Introduce yourself and explain why you want this
//! role") must be answered completely; skipping decomposition for long
//! inputs drops sub-answers. So decomposition always runs, but bounded: one
//! structured completion call under a hard timeout, with a conjunction-based
//! heuristic split as the recovery path. `decompose` never errors, never
//! blocks past its budget, and always returns 1..=3 sub-questions.

use std::sync::Arc;
use std::time::Duration;

use quickcue_core::config::DecomposeConfig;
use quickcue_core::traits::CompletionProvider;
use quickcue_core::types::{CompletionRequest, SubQuestion};

const DECOMPOSE_SYSTEM_PROMPT: &str = "\
You split a possibly-compound question into atomic sub-questions.\n\
Rules:\n\
- Output one sub-question per line, nothing else.\n\
- At most 3 sub-questions.\n\
- If the question already asks a single thing, output it unchanged as one line.\n\
- Preserve the asker's wording; do not answer anything.";

/// Conjunction boundaries for the heuristic split, matched case-insensitively.
const CONJUNCTIONS: [&str; 4] = [" and ", " however ", " also ", " but "];

#[derive(Clone)]
pub struct Decomposer {
    completion: Arc<dyn CompletionProvider>,
    config: DecomposeConfig,
}

impl Decomposer {
    pub fn new(completion: Arc<dyn CompletionProvider>, config: DecomposeConfig) -> Self {
        Self { completion, config }
    }

    /// Split `question` into 1..=3 atomic sub-questions.
    pub async fn decompose(&self, question: &str) -> Vec<SubQuestion> {
        let budget = Duration::from_secs(self.config.timeout_secs);
        let request = CompletionRequest::new(DECOMPOSE_SYSTEM_PROMPT, question);

        let mut fragments =
            match tokio::time::timeout(budget, self.completion.complete(&request)).await {
                Ok(Ok(text)) => parse_sub_questions(&text),
                Ok(Err(e)) => {
                    tracing::warn!("decomposition call failed ({e}), using heuristic split");
                    heuristic_split(question)
                }
                Err(_) => {
                    tracing::warn!(
                        "decomposition timed out after {}s, using heuristic split",
                        self.config.timeout_secs
                    );
                    heuristic_split(question)
                }
            };

        if fragments.is_empty() {
            fragments = heuristic_split(question);
        }
        if fragments.is_empty() {
            fragments = vec![question.trim().to_string()];
        }

        if fragments.len() > self.config.max_sub_questions {
            tracing::warn!(
                "decomposition produced {} fragments, truncating to {}",
                fragments.len(),
                self.config.max_sub_questions
            );
            fragments.truncate(self.config.max_sub_questions);
        }

        fragments
            .into_iter()
            .enumerate()
            .map(|(i, text)| SubQuestion::new(text, i))
            .collect()
    }
}

/// Parse the model's line-per-sub-question output, tolerating bullets and
/// numbering.
fn parse_sub_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.ends_with(':'))
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    // "1." / "2)" style numbering
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim_start();
        }
    }
    line
}

/// Split on conjunction boundaries, trim, drop empty fragments.
///
/// The recovery path when the structured call is unavailable; a question
/// with no conjunctions comes back as a single fragment.
pub fn heuristic_split(question: &str) -> Vec<String> {
    let mut fragments = vec![question.to_string()];
    for conj in CONJUNCTIONS {
        let mut next = Vec::new();
        for fragment in fragments {
            next.extend(split_case_insensitive(&fragment, conj));
        }
        fragments = next;
    }

    fragments
        .into_iter()
        .map(|f| f.trim().trim_matches(',').trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Split `text` on every case-insensitive occurrence of the ASCII separator,
/// preserving the original casing of the fragments.
fn split_case_insensitive(text: &str, sep: &str) -> Vec<String> {
    let lower = text.to_ascii_lowercase();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(pos) = lower[search..].find(sep) {
        let at = search + pos;
        parts.push(text[start..at].to_string());
        start = at + sep.len();
        search = start;
    }
    parts.push(text[start..].to_string());
    parts
}
