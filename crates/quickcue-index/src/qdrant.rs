//! Qdrant HTTP client.
//!
//! Talks to the `points/query` API of one collection. Every search is scoped
//! by an `owner_id` payload filter; the query vector is serialized as a JSON
//! number array, never a stringified representation, which some backing
//! stores accept and then silently mismatch against.

use async_trait::async_trait;
use serde_json::{Value, json};

use quickcue_core::config::IndexConfig;
use quickcue_core::error::{QuickCueError, Result};
use quickcue_core::traits::{IndexQuery, VectorIndex};
use quickcue_core::types::IndexHit;

pub struct QdrantIndex {
    base_url: String,
    collection: String,
    client: reqwest::Client,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn query_url(&self) -> String {
        format!(
            "{}/collections/{}/points/query",
            self.base_url, self.collection
        )
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>> {
        let body = json!({
            "query": query.vector,
            "filter": {
                "must": [
                    { "key": "owner_id", "match": { "value": query.scope.as_str() } }
                ]
            },
            "limit": query.limit,
            "score_threshold": query.threshold,
            "with_payload": true,
        });

        let resp = self
            .client
            .post(self.query_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| QuickCueError::Http(format!("qdrant connection failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuickCueError::Index(format!(
                "qdrant query error {status}: {text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| QuickCueError::Http(e.to_string()))?;

        let hits = parse_query_response(&json);
        tracing::debug!(
            "qdrant returned {} hits for scope {} (threshold {})",
            hits.len(),
            query.scope,
            query.threshold
        );
        Ok(hits)
    }
}

/// Map a `points/query` response body into hits. Points arrive ranked by
/// score descending; entries with missing payload fields are skipped.
fn parse_query_response(json: &Value) -> Vec<IndexHit> {
    let Some(points) = json["result"]["points"].as_array() else {
        return Vec::new();
    };

    points
        .iter()
        .filter_map(|p| {
            let entry_id = match &p["id"] {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(IndexHit {
                entry_id,
                question_text: p["payload"]["question"].as_str()?.to_string(),
                answer_text: p["payload"]["answer"].as_str()?.to_string(),
                similarity: p["score"].as_f64()? as f32,
            })
        })
        .collect()
}
