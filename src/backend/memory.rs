//! In-memory reference backend
//!
//! A transactional map used by tests, benches, and the stress driver. It
//! stages writes between `begin()` and `commit()` and only applies them on
//! commit, so tests can observe real transaction bracketing.
//!
//! The backend is a cheap-to-clone handle over shared state: one clone moves
//! into the store, another stays with the caller for verification.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{DriftError, Result};

use super::Backend;

/// A staged, not-yet-committed write
enum StagedOp {
    Set(String, Bytes),
    Del(String),
}

#[derive(Default)]
struct Inner {
    committed: HashMap<String, Bytes>,
    staged: Vec<StagedOp>,
    in_txn: bool,
}

/// Shared-handle in-memory backend
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Read-side accessors (verification surface, not part of the contract)
    // =========================================================================

    /// Get the committed value for a key
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.lock().committed.get(key).cloned()
    }

    /// True if a committed row exists for the key
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().committed.contains_key(key)
    }

    /// Number of committed rows
    pub fn len(&self) -> usize {
        self.inner.lock().committed.len()
    }

    /// True if no rows have been committed
    pub fn is_empty(&self) -> bool {
        self.inner.lock().committed.is_empty()
    }
}

impl Backend for MemoryBackend {
    fn begin(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.in_txn {
            return Err(DriftError::Transaction(
                "begin() while a transaction is already open".to_string(),
            ));
        }
        inner.staged.clear();
        inner.in_txn = true;
        Ok(())
    }

    fn set(&mut self, key: &str, value: Bytes) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.in_txn {
            return Err(DriftError::Transaction(
                "set() outside a transaction".to_string(),
            ));
        }
        inner.staged.push(StagedOp::Set(key.to_string(), value));
        Ok(())
    }

    fn del(&mut self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        if !inner.in_txn {
            return Err(DriftError::Transaction(
                "del() outside a transaction".to_string(),
            ));
        }

        // Answer existence against the staged view: a later staged op for the
        // same key overrides the committed row.
        let existed = inner
            .staged
            .iter()
            .rev()
            .find_map(|op| match op {
                StagedOp::Set(k, _) if k == key => Some(true),
                StagedOp::Del(k) if k == key => Some(false),
                _ => None,
            })
            .unwrap_or_else(|| inner.committed.contains_key(key));

        inner.staged.push(StagedOp::Del(key.to_string()));
        Ok(existed)
    }

    fn commit(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.in_txn {
            return Err(DriftError::Transaction(
                "commit() without begin()".to_string(),
            ));
        }
        let staged = std::mem::take(&mut inner.staged);
        for op in staged {
            match op {
                StagedOp::Set(key, value) => {
                    inner.committed.insert(key, value);
                }
                StagedOp::Del(key) => {
                    inner.committed.remove(&key);
                }
            }
        }
        inner.in_txn = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.committed.clear();
        inner.staged.clear();
        inner.in_txn = false;
        Ok(())
    }
}
