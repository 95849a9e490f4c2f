//! QuickCue error taxonomy.
//!
//! Upstream-service flakiness (provider errors, timeouts, index failures) is
//! absorbed inside the pipeline and converted into "this stage contributed
//! nothing". Only contract violations, such as a malformed scope or a broken
//! config file, surface to the caller as hard errors.

use thiserror::Error;

/// All errors produced by QuickCue crates.
#[derive(Error, Debug)]
pub enum QuickCueError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API key missing for provider '{0}'")]
    ApiKeyMissing(String),

    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("{stage} timed out after {budget_secs}s")]
    StageTimeout { stage: String, budget_secs: u64 },

    #[error("Invalid user scope: {0}")]
    InvalidScope(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QuickCueError>;
