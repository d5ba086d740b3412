//! Error types for driftkv
//!
//! Provides a unified error type for all operations.
//!
//! Foreground operations (`set`/`get`/`delete`) never touch the backend and
//! are infallible; errors only arise from the backend, from the transaction
//! bracket, or from the flusher thread lifecycle.

use thiserror::Error;

/// Result type alias using DriftError
pub type Result<T> = std::result::Result<T, DriftError>;

/// Unified error type for driftkv operations
#[derive(Debug, Error)]
pub enum DriftError {
    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("backend operation failed: {0}")]
    Backend(String),

    #[error("transaction misuse: {0}")]
    Transaction(String),

    // -------------------------------------------------------------------------
    // Flusher Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("failed to start flusher thread: {0}")]
    FlusherStart(#[source] std::io::Error),

    #[error("flusher thread panicked")]
    FlusherPanicked,
}
