//! Typed errors for the memory store.
//!
//! Most fallible paths propagate `anyhow::Error` with context, following the
//! rest of the crate. The variants here are the ones callers dispatch on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Update target does not exist. Deletes tolerate unknown ids; updates do not.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// The sqlite-vec backend did not load. Search degrades to keyword-only;
    /// explicit indexing commands fail with this error.
    #[error("vector backend unavailable: sqlite-vec could not be loaded")]
    VectorBackendUnavailable,

    /// Query vector length does not match the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Command dispatch was given a name outside the advertised set.
    #[error("unknown command \"{command}\". Available: {valid}")]
    UnknownCommand { command: String, valid: String },
}
