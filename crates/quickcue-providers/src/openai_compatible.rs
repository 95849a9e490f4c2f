//! Unified OpenAI-compatible completion provider.
//!
//! One struct handles chat completions for every OpenAI-compatible API; the
//! registry distinguishes providers only by endpoint URL, auth style, and key.
//! Supports both one-shot calls and SSE streaming with mid-stream
//! cancellation (dropping the stream tears down the HTTP request).

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio_stream::wrappers::ReceiverStream;

use quickcue_core::config::QuickCueConfig;
use quickcue_core::error::{QuickCueError, Result};
use quickcue_core::traits::{CompletionProvider, TextStream};
use quickcue_core::types::CompletionRequest;

use crate::provider_registry::{self, AuthStyle};

/// A completion provider that works with any OpenAI-compatible API.
#[derive(Debug)]
pub struct OpenAiCompletionProvider {
    /// Provider name (e.g., "glm", "openai", "groq").
    name: String,
    api_key: String,
    base_url: String,
    chat_path: String,
    auth_style: AuthStyle,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompletionProvider {
    /// Create from config. Resolution order for the API key:
    /// `config.llm.api_key` > env vars from the registry entry.
    ///
    /// Fails at construction when a provider that requires auth has no key;
    /// a missing credential must never turn into a silently-disabled feature.
    pub fn from_config(config: &QuickCueConfig) -> Result<Self> {
        let name = config.llm.provider.as_str();

        // Custom endpoint: "custom:https://my-server.com/v1"
        if let Some(endpoint) = name.strip_prefix("custom:") {
            let api_key = if !config.llm.api_key.is_empty() {
                config.llm.api_key.clone()
            } else {
                std::env::var("CUSTOM_API_KEY").unwrap_or_default()
            };
            let auth_style = if api_key.is_empty() {
                AuthStyle::None
            } else {
                AuthStyle::Bearer
            };
            return Ok(Self {
                name: "custom".into(),
                api_key,
                base_url: endpoint.trim_end_matches('/').to_string(),
                chat_path: "/chat/completions".into(),
                auth_style,
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
                client: reqwest::Client::new(),
            });
        }

        let registry = provider_registry::get_provider_config(name)
            .ok_or_else(|| QuickCueError::ProviderNotFound(name.into()))?;

        let api_key = if !config.llm.api_key.is_empty() {
            config.llm.api_key.clone()
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

        let base_url = if !config.llm.endpoint.is_empty() {
            config.llm.endpoint.clone()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| std::env::var(env_key).ok())
                .map(|val| {
                    if val.ends_with("/v1") {
                        val
                    } else {
                        format!("{}/v1", val.trim_end_matches('/'))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            auth_style: registry.auth_style,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            client: reqwest::Client::new(),
        })
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, self.chat_path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let resp = self.apply_auth(req).send().await.map_err(|e| {
            QuickCueError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuickCueError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let resp = self.post(&self.body(request, false)).await?;

        let json: Value = resp
            .json()
            .await
            .map_err(|e| QuickCueError::Http(e.to_string()))?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| QuickCueError::Provider("No choices in response".into()))?;

        Ok(content.to_string())
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream> {
        let resp = self.post(&self.body(request, true)).await?;

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(32);
        let provider = self.name.clone();
        let mut bytes = resp.bytes_stream();

        // Reader task: parses SSE frames and forwards deltas. A closed
        // receiver means the consumer dropped the stream; returning here
        // drops `bytes` and cancels the HTTP request.
        tokio::spawn(async move {
            let mut buf = String::new();
            let mut chunk_count = 0u32;

            while let Some(piece) = bytes.next().await {
                let piece = match piece {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = tx
                            .send(Err(QuickCueError::Http(format!(
                                "{provider} stream error: {e}"
                            ))))
                            .await;
                        return;
                    }
                };
                buf.push_str(&String::from_utf8_lossy(&piece));

                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    let line = line.trim();
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        tracing::debug!("{} streaming complete: {} chunks", provider, chunk_count);
                        return;
                    }
                    if let Ok(frame) = serde_json::from_str::<Value>(data)
                        && let Some(delta) = frame["choices"][0]["delta"]["content"].as_str()
                        && !delta.is_empty()
                    {
                        chunk_count += 1;
                        if tx.send(Ok(delta.to_string())).await.is_err() {
                            tracing::debug!("{} stream consumer dropped, cancelling", provider);
                            return;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Extract content deltas from one raw SSE payload line (without the
/// `data:` prefix). Exposed for tests.
pub fn parse_sse_delta(data: &str) -> Option<String> {
    if data == "[DONE]" {
        return None;
    }
    let frame: Value = serde_json::from_str(data).ok()?;
    let delta = frame["choices"][0]["delta"]["content"].as_str()?;
    (!delta.is_empty()).then(|| delta.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_delta_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_sse_delta(data), Some("Hello".to_string()));
    }

    #[test]
    fn test_parse_sse_delta_done_marker() {
        assert_eq!(parse_sse_delta("[DONE]"), None);
    }

    #[test]
    fn test_parse_sse_delta_empty_and_role_frames() {
        assert_eq!(parse_sse_delta(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(parse_sse_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#), None);
        assert_eq!(parse_sse_delta("not json"), None);
    }

    #[test]
    fn test_missing_key_fails_loudly() {
        let mut config = QuickCueConfig::default();
        config.llm.provider = "groq".into();
        config.llm.api_key = String::new();
        // Only run the negative assertion when the environment has no key
        if std::env::var("GROQ_API_KEY").is_err() {
            let err = OpenAiCompletionProvider::from_config(&config).unwrap_err();
            assert!(matches!(err, QuickCueError::ApiKeyMissing(_)));
        }
    }

    #[test]
    fn test_custom_endpoint() {
        let mut config = QuickCueConfig::default();
        config.llm.provider = "custom:https://my-server.com/v1/".into();
        config.llm.api_key = "k".into();
        let provider = OpenAiCompletionProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "custom");
        assert_eq!(provider.base_url, "https://my-server.com/v1");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = QuickCueConfig::default();
        config.llm.provider = "no-such-provider".into();
        let err = OpenAiCompletionProvider::from_config(&config).unwrap_err();
        assert!(matches!(err, QuickCueError::ProviderNotFound(_)));
    }

    #[test]
    fn test_local_provider_without_key() {
        let mut config = QuickCueConfig::default();
        config.llm.provider = "ollama".into();
        let provider = OpenAiCompletionProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
