//! # driftkv
//!
//! An embeddable write-back key-value store:
//! - Mutations apply to memory and return immediately
//! - A background flusher drains dirty keys into a transactional backend
//! - Bounded batches, one begin/commit bracket per batch
//! - Cooperative shutdown that joins the flusher without losing writes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Foreground Callers                        │
//! │                  (set / get / delete)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one mutex
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Table     │          │ Dirty Queue │──── condvar signal
//!   │ (key→value) │          │   (FIFO)    │           │
//!   └─────────────┘          └──────┬──────┘           ▼
//!                                   │ queue swap ┌───────────┐
//!                                   └───────────▶│  Flusher  │
//!                                                └─────┬─────┘
//!                                                      │ begin/commit
//!                                                      ▼
//!                                                ┌───────────┐
//!                                                │  Backend  │
//!                                                └───────────┘
//! ```
//!
//! Reads never touch the backend: the in-memory table is the sole source
//! of truth, and the cache is not warmed from backend contents at startup.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod backend;
pub mod store;

mod flusher;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{Backend, MemoryBackend};
pub use config::Config;
pub use error::{DriftError, Result};
pub use store::{StoredValue, WriteBackStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of driftkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
