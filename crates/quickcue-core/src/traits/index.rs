//! Vector index client contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexHit, UserScope};

/// One scoped similarity query.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    /// Query embedding, passed to the backend as a native numeric array.
    pub vector: Vec<f32>,
    /// Tenant scope; only entries owned by this scope may be returned.
    pub scope: UserScope,
    /// Minimum similarity for a hit to be returned.
    pub threshold: f32,
    /// Maximum number of hits.
    pub limit: usize,
}

/// Ranked similarity search over the external knowledge store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Return hits ranked by similarity descending. The caller applies the
    /// per-call timeout; implementations only need to be cancel-safe.
    async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>>;
}
