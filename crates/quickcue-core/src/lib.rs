//! # QuickCue Core
//!
//! Shared foundation for the QuickCue answer engine: the data model of one
//! question-answer run, configuration, the error taxonomy, and the traits
//! every external collaborator (embedding provider, completion provider,
//! vector index, answer cache) must implement.
//!
//! Nothing in this crate performs I/O; it is the vocabulary the other
//! crates speak.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::QuickCueConfig;
pub use error::{QuickCueError, Result};
