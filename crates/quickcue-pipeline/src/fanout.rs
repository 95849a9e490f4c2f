//! Concurrent per-sub-question search fan-out.
//!
//! One task per sub-question (embed, then scoped index search), each under
//! its own timeout, all running concurrently so total wall time is bounded
//! by the slowest single search rather than the sum. A failed or timed-out
//! sub-search contributes nothing; the merge still runs over whatever the
//! healthy searches returned.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use quickcue_core::config::RetrievalConfig;
use quickcue_core::error::Result;
use quickcue_core::traits::{EmbeddingProvider, IndexQuery, VectorIndex};
use quickcue_core::types::{RankedMatchSet, SearchMatch, SubQuestion, UserScope};

#[derive(Clone)]
pub struct SearchFanout {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl SearchFanout {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Search the index for every sub-question concurrently and merge the
    /// results. Never errors: the worst outcome is an empty set.
    pub async fn search(&self, sub_questions: &[SubQuestion], scope: &UserScope) -> RankedMatchSet {
        let budget = Duration::from_secs(self.config.search_timeout_secs);
        let mut tasks = JoinSet::new();

        for sub in sub_questions.iter().cloned() {
            let embedder = Arc::clone(&self.embedder);
            let index = Arc::clone(&self.index);
            let scope = scope.clone();
            let config = self.config.clone();

            tasks.spawn(async move {
                let origin = sub.origin_index;
                match tokio::time::timeout(budget, sub_search(embedder, index, &sub, &scope, &config))
                    .await
                {
                    Ok(Ok(hits)) => hits
                        .into_iter()
                        .map(|h| SearchMatch::from_hit(h, origin))
                        .collect(),
                    Ok(Err(e)) => {
                        tracing::warn!("search for sub-question {origin} failed: {e}");
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!(
                            "search for sub-question {origin} timed out after {}s",
                            config.search_timeout_secs
                        );
                        Vec::new()
                    }
                }
            });
        }

        let mut batches = Vec::with_capacity(sub_questions.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(batch) => batches.push(batch),
                Err(e) => tracing::warn!("search task panicked: {e}"),
            }
        }

        RankedMatchSet::merge(batches, self.config.max_merged)
    }
}

async fn sub_search(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    sub: &SubQuestion,
    scope: &UserScope,
    config: &RetrievalConfig,
) -> Result<Vec<quickcue_core::types::IndexHit>> {
    let vector = embedder.embed(&sub.text).await?;
    index
        .search(&IndexQuery {
            vector,
            scope: scope.clone(),
            threshold: config.similarity_floor,
            limit: config.per_search_limit,
        })
        .await
}
