//! QuickCue configuration system.
//!
//! All empirically-tuned constants (reuse threshold, similarity floor,
//! per-stage timeouts, result limits) live here rather than in code. Baseline
//! values come from the observed production system; operators should validate
//! them against their own embedding model's similarity distribution.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{QuickCueError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickCueConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub decompose: DecomposeConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

impl Default for QuickCueConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            decompose: DecomposeConfig::default(),
            resilience: ResilienceConfig::default(),
        }
    }
}

impl QuickCueConfig {
    /// Load config from the default path (~/.quickcue/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuickCueError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| QuickCueError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuickCueError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quickcue")
            .join("config.toml")
    }
}

/// Completion (generation) provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Explicit endpoint override; empty means the registry default.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_provider() -> String { "glm".into() }
fn default_llm_model() -> String { "glm-4-flash".into() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 512 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: String::new(),
            endpoint: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    /// Fixed output dimensionality; a response of any other length is an error.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String { "openai".into() }
fn default_embedding_model() -> String { "text-embedding-3-small".into() }
fn default_dimensions() -> usize { 1536 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: String::new(),
            endpoint: String::new(),
            dimensions: default_dimensions(),
        }
    }
}

/// Vector index (Qdrant) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_index_url() -> String { "http://localhost:6333".into() }
fn default_collection() -> String { "qa_entries".into() }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            collection: default_collection(),
        }
    }
}

/// Retrieval and selection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum similarity for an index hit to be returned at all.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,
    /// Minimum best-match similarity to reuse a stored answer verbatim.
    /// 0.62 is the practical paraphrase threshold; ~0.92 is near-duplicate
    /// territory and discards good matches.
    #[serde(default = "default_reuse_threshold")]
    pub reuse_threshold: f32,
    /// Hits requested per sub-question search.
    #[serde(default = "default_per_search_limit")]
    pub per_search_limit: usize,
    /// Cap on the merged, deduplicated match set.
    #[serde(default = "default_max_merged")]
    pub max_merged: usize,
    /// Per-sub-question search budget (embed + index call).
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    /// How many top matches feed the synthesis context window.
    #[serde(default = "default_context_matches")]
    pub context_matches: usize,
}

fn default_similarity_floor() -> f32 { 0.60 }
fn default_reuse_threshold() -> f32 { 0.62 }
fn default_per_search_limit() -> usize { 3 }
fn default_max_merged() -> usize { 5 }
fn default_search_timeout() -> u64 { 5 }
fn default_context_matches() -> usize { 3 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_floor: default_similarity_floor(),
            reuse_threshold: default_reuse_threshold(),
            per_search_limit: default_per_search_limit(),
            max_merged: default_max_merged(),
            search_timeout_secs: default_search_timeout(),
            context_matches: default_context_matches(),
        }
    }
}

/// Question decomposition tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeConfig {
    /// Budget for the structured decomposition call before the heuristic
    /// split takes over.
    #[serde(default = "default_decompose_timeout")]
    pub timeout_secs: u64,
    /// Hard cap on sub-questions per run.
    #[serde(default = "default_max_sub_questions")]
    pub max_sub_questions: usize,
}

fn default_decompose_timeout() -> u64 { 10 }
fn default_max_sub_questions() -> usize { 3 }

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_decompose_timeout(),
            max_sub_questions: default_max_sub_questions(),
        }
    }
}

/// Resilience chain tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Budget for the whole live-generation stream, first token to last.
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
    /// Operator override for the terminal safe response. Empty means the
    /// pipeline picks a built-in line matched to the question's kind.
    #[serde(default)]
    pub generic_answer: String,
}

fn default_generation_timeout() -> u64 { 30 }

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: default_generation_timeout(),
            generic_answer: String::new(),
        }
    }
}
