//! Flusher Module
//!
//! The background worker that drains the dirty queue into the backend.
//!
//! One flusher runs per store instance, for the store's entire lifetime.
//! Its loop is a single state transition, running to stopped: while the
//! stop flag is clear it calls the blocking flush cycle, which parks on
//! the condvar whenever the queue is empty. A backend failure is fatal to
//! the loop; there is no retry or restart. The loop's `Result` is what
//! `WriteBackStore::close` surfaces to the owner.

use std::sync::Arc;

use crate::error::Result;
use crate::store::Shared;

/// The background flush worker
pub(crate) struct Flusher {
    shared: Arc<Shared>,
}

impl Flusher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Run until stopped or until a flush cycle fails.
    pub(crate) fn run(self) -> Result<()> {
        while !self.shared.stopped() {
            if let Err(e) = self.shared.flush_cycle(true) {
                tracing::error!("fatal error in flush cycle: {e}");
                return Err(e);
            }
        }
        tracing::info!("shutting down flusher");
        Ok(())
    }
}
