//! Embedding and completion provider contracts.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;
use crate::types::CompletionRequest;

/// Streamed completion output. Dropping the stream cancels the underlying
/// provider call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Text → fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Output dimensionality every embedding must have.
    fn dimensions(&self) -> usize;

    /// Embed one text. Fails cleanly rather than returning a vector of the
    /// wrong length; the result is always passed downstream as a native
    /// numeric array, never a stringified representation.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Prompt/context → generated text, one-shot or streamed.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// One-shot completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Streaming completion; chunks arrive as the provider produces them and
    /// the call is cancellable mid-stream by dropping the returned stream.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream>;
}
