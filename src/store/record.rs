//! Stored value record
//!
//! A value plus its dirty flag. Dirty means the current value has not been
//! durably written since its last mutation.

use bytes::Bytes;

/// A single table entry: the live value and whether it still needs a flush
#[derive(Debug, Clone)]
pub struct StoredValue {
    value: Bytes,
    dirty: bool,
}

impl StoredValue {
    /// Create a record.
    ///
    /// `dirty` is inherited from the record being replaced on overwrite: a
    /// key that was already dirty is already queued, so the fresh record
    /// starts dirty and the enqueue is skipped.
    pub fn new(value: Bytes, dirty: bool) -> Self {
        Self { value, dirty }
    }

    /// The current in-memory value
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// True if this value has not been durably written since its last change
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the record as needing a durable write
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Mark the record as durably written
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
