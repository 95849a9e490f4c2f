//! Grounded streaming synthesis.
//!
//! Builds a completion request from the question plus the top retrieved Q&A
//! pairs as in-context examples, then re-chunks the provider's token deltas
//! on sentence boundaries so consumers render whole sentences instead of
//! word fragments.

use std::sync::Arc;

use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use quickcue_core::error::Result;
use quickcue_core::traits::{CompletionProvider, TextStream};
use quickcue_core::types::{CompletionRequest, RankedMatchSet};

const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You answer interview questions in the first person, speaking as the \
candidate. Ground your answer in the candidate's own prepared answers given \
below; stay consistent with them and do not invent facts they contradict. \
Keep the answer concise and spoken-word natural.";

#[derive(Clone)]
pub struct SynthesisEngine {
    completion: Arc<dyn CompletionProvider>,
    context_matches: usize,
}

impl SynthesisEngine {
    pub fn new(completion: Arc<dyn CompletionProvider>, context_matches: usize) -> Self {
        Self {
            completion,
            context_matches,
        }
    }

    /// Start a grounded generation for `question`. The returned stream yields
    /// sentence-sized chunks; dropping it cancels the provider call.
    pub async fn synthesize(&self, question: &str, context: &RankedMatchSet) -> Result<TextStream> {
        let request = self.build_request(question, context);
        let inner = self.completion.complete_stream(&request).await?;
        Ok(sentence_chunks(inner))
    }

    fn build_request(&self, question: &str, context: &RankedMatchSet) -> CompletionRequest {
        let mut user = String::new();
        if !context.is_empty() {
            user.push_str("My prepared answers:\n\n");
            for m in context.top(self.context_matches) {
                user.push_str(&format!("Q: {}\nA: {}\n\n", m.question_text, m.answer_text));
            }
        }
        user.push_str(&format!("Interview question: {question}"));
        CompletionRequest::new(SYNTHESIS_SYSTEM_PROMPT, user)
    }
}

/// Re-chunk a token-delta stream on sentence boundaries.
///
/// Buffers incoming deltas and releases a chunk whenever the buffer holds a
/// complete sentence; whatever remains when the inner stream ends is flushed
/// as a final chunk. Errors pass through and terminate the stream.
pub fn sentence_chunks(mut inner: TextStream) -> TextStream {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(16);

    tokio::spawn(async move {
        let mut buf = String::new();
        while let Some(item) = inner.next().await {
            match item {
                Ok(delta) => {
                    buf.push_str(&delta);
                    while let Some(sentence) = drain_complete_sentence(&mut buf) {
                        if !sentence.trim().is_empty()
                            && tx.send(Ok(sentence)).await.is_err()
                        {
                            // Consumer gone; dropping `inner` cancels upstream
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
        let rest = buf.trim();
        if !rest.is_empty() {
            let _ = tx.send(Ok(rest.to_string())).await;
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Remove and return the first complete sentence in `buf`, boundary included.
fn drain_complete_sentence(buf: &mut String) -> Option<String> {
    let end = buf
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|(i, c)| i + c.len_utf8())?;
    let sentence: String = buf.drain(..end).collect();
    Some(sentence)
}
