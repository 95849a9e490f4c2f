//! Stored-answer reuse decision.

use quickcue_core::types::{RankedMatchSet, SearchMatch};

/// Decide whether a stored answer is close enough to reuse verbatim.
///
/// This is the only place the reuse rule exists; every answer path calls it
/// rather than comparing similarities inline. Returns the best match when
/// its similarity clears `reuse_threshold`, otherwise `None` and the caller
/// synthesizes instead.
pub fn select_stored(matches: &RankedMatchSet, reuse_threshold: f32) -> Option<&SearchMatch> {
    matches.best().filter(|m| m.similarity >= reuse_threshold)
}
