//! Collaborator traits.
//!
//! Every external, variable-latency dependency sits behind one of these
//! object-safe traits so the pipeline can be wired with real providers in
//! production and hand-rolled mocks in tests.

pub mod cache;
pub mod index;
pub mod provider;

pub use cache::AnswerCache;
pub use index::{IndexQuery, VectorIndex};
pub use provider::{CompletionProvider, EmbeddingProvider, TextStream};
