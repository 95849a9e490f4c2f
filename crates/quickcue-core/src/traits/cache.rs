//! Semantic answer cache contract.
//!
//! The one shared mutable collaborator the pipeline is allowed to touch
//! across runs. Infallible by signature: a cache that loses entries or
//! refuses writes can never affect the answer path.

use async_trait::async_trait;

use crate::types::UserScope;

/// Cache of previously generated answers, keyed per scope.
#[async_trait]
pub trait AnswerCache: Send + Sync {
    /// Look up a cached generation for this question, if any.
    async fn lookup(&self, question: &str, scope: &UserScope) -> Option<String>;

    /// Store a generated answer. Best effort; failures are swallowed.
    async fn store(&self, question: &str, scope: &UserScope, answer: &str);
}
