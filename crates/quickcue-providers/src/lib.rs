//! # QuickCue Providers
//!
//! Embedding and completion providers for QuickCue.
//!
//! All OpenAI-compatible backends (OpenAI, GLM/ZhipuAI, Groq, Ollama, custom
//! endpoints) are handled by a single pair of structs parameterized by the
//! static provider registry. Both critical collaborators are constructed
//! explicitly from config and fail loudly at startup when a required API key
//! is missing; a provider is never "silently off".

pub mod embedding;
pub mod openai_compatible;
pub mod provider_registry;

use std::sync::Arc;

use quickcue_core::config::QuickCueConfig;
use quickcue_core::error::Result;
use quickcue_core::traits::{CompletionProvider, EmbeddingProvider};

pub use embedding::OpenAiEmbeddingProvider;
pub use openai_compatible::OpenAiCompletionProvider;

/// Create the completion provider named in `config.llm`.
///
/// Custom endpoints use the form `custom:https://my-server.com/v1`.
pub fn create_completion_provider(config: &QuickCueConfig) -> Result<Arc<dyn CompletionProvider>> {
    let provider = OpenAiCompletionProvider::from_config(config)?;
    Ok(Arc::new(provider))
}

/// Create the embedding provider named in `config.embedding`.
pub fn create_embedding_provider(config: &QuickCueConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = OpenAiEmbeddingProvider::from_config(config)?;
    Ok(Arc::new(provider))
}

/// List all known provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("custom");
    names
}
