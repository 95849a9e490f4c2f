//! OpenAI-compatible embedding provider.
//!
//! Returns fixed-dimension `Vec<f32>` vectors. A response of any other
//! length is an error; vectors travel downstream as native numeric arrays
//! only; a stringified vector silently breaks similarity search in some
//! backing stores.

use async_trait::async_trait;
use serde_json::{Value, json};

use quickcue_core::config::QuickCueConfig;
use quickcue_core::error::{QuickCueError, Result};
use quickcue_core::traits::EmbeddingProvider;

use crate::provider_registry::{self, AuthStyle};

#[derive(Debug)]
pub struct OpenAiEmbeddingProvider {
    name: String,
    api_key: String,
    base_url: String,
    embeddings_path: String,
    auth_style: AuthStyle,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    /// Create from config. API key resolution: `config.embedding.api_key` >
    /// registry env vars. Fails at construction when auth is required but no
    /// key was found.
    pub fn from_config(config: &QuickCueConfig) -> Result<Self> {
        let name = config.embedding.provider.as_str();
        let registry = provider_registry::get_provider_config(name)
            .ok_or_else(|| QuickCueError::ProviderNotFound(name.into()))?;

        let api_key = if !config.embedding.api_key.is_empty() {
            config.embedding.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };
        if registry.auth_style == AuthStyle::Bearer && api_key.is_empty() {
            return Err(QuickCueError::ApiKeyMissing(registry.name.into()));
        }

        let base_url = if !config.embedding.endpoint.is_empty() {
            config.embedding.endpoint.clone()
        } else {
            registry.base_url.to_string()
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            embeddings_path: registry.embeddings_path.to_string(),
            auth_style: registry.auth_style,
            model: config.embedding.model.clone(),
            dimensions: config.embedding.dimensions,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}{}", self.base_url, self.embeddings_path);
        let body = json!({
            "model": self.model,
            "input": text,
        });

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if self.auth_style == AuthStyle::Bearer && !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.send().await.map_err(|e| {
            QuickCueError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuickCueError::Embedding(format!(
                "{} embeddings API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| QuickCueError::Http(e.to_string()))?;

        let vector: Vec<f32> = json["data"]
            .get(0)
            .and_then(|d| d["embedding"].as_array())
            .ok_or_else(|| QuickCueError::Embedding("No embedding in response".into()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.len() != self.dimensions {
            return Err(QuickCueError::Embedding(format!(
                "{} returned a {}-dim vector, expected {}",
                self.name,
                vector.len(),
                self.dimensions
            )));
        }

        Ok(vector)
    }
}
