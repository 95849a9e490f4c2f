//! # QuickCue Index
//!
//! Vector index clients behind the `VectorIndex` trait:
//!
//! - [`QdrantIndex`]: HTTP client for a Qdrant collection, the production
//!   backend. Query vectors are sent as native JSON number arrays.
//! - [`MemoryIndex`]: in-process cosine-similarity index over
//!   `KnowledgeEntry` values, for tests, demos, and offline use.
//!
//! Both are read-only from the pipeline's point of view; the knowledge base
//! is owned and written by an external store.

pub mod memory;
pub mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
