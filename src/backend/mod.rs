//! Backend Module
//!
//! The transactional key-value contract the store drains into.
//!
//! ## Responsibilities
//! - Define the minimal surface a durable backing store must satisfy
//! - Bracket exactly one flush batch per `begin()`/`commit()` pair
//! - Surface every write failure to the flush cycle (no retry policy here)
//!
//! Implementations are expected to be slow relative to memory (disk, SQL,
//! an embedded database); the store never calls them on the foreground path.

mod memory;

pub use memory::MemoryBackend;

use bytes::Bytes;

use crate::error::Result;

/// Transactional key-value backend.
///
/// The flusher holds an exclusive handle while draining, so methods take
/// `&mut self`; implementations do not need internal locking to satisfy the
/// store. `Send` is required because all calls happen on the flusher thread.
///
/// Contract:
/// - `begin`/`commit` bracket exactly one flush batch.
/// - `set` is an idempotent upsert.
/// - `del` reports whether a row actually existed.
/// - Any failure inside the bracket escalates out of the flush cycle; the
///   store defines no rollback-and-retry policy.
pub trait Backend: Send {
    /// Open a transaction. No-op for backends without explicit transactions.
    fn begin(&mut self) -> Result<()>;

    /// Upsert a key-value pair inside the current transaction.
    fn set(&mut self, key: &str, value: Bytes) -> Result<()>;

    /// Delete a key if present. Returns true if a row was removed.
    fn del(&mut self, key: &str) -> Result<bool>;

    /// Durably apply everything written since `begin()`.
    fn commit(&mut self) -> Result<()>;

    /// Destroy and recreate the backend's persisted state.
    fn reset(&mut self) -> Result<()>;
}
