//! Store Module
//!
//! The write-back store orchestrator: the facade that serves reads and
//! writes from memory and hands durability to the background flusher.
//!
//! ## Responsibilities
//! - Serve get/set/delete from the in-memory table (the sole source of
//!   truth for reads; the backend is never consulted on a miss)
//! - Track dirty keys in a FIFO queue, at most one entry per dirty key
//! - Detach the queue wholesale per flush cycle and drain it into the
//!   backend in bounded, transactional batches
//! - Join the flusher on close without dropping pending writes
//!
//! ## Concurrency Model
//!
//! Two logical actors: any number of foreground callers and exactly one
//! background flusher thread.
//!
//! - One mutex guards the table and the queue; every structural access
//!   happens under it.
//! - The condvar paired with that mutex is a pure "work may be available"
//!   signal; it never carries a value.
//! - The table lock is released before any backend call, so foreground
//!   operations are never blocked behind a backend commit.
//! - The backend sits behind its own mutex, held for exactly one
//!   begin/commit bracket at a time.
//! - A drain mutex serializes whole flush cycles, so a foreground flush
//!   (reset, close) and the flusher never interleave two detached queues'
//!   brackets against the backend.
//!
//! Lock order is drain -> state -> backend; no path acquires them in any
//! other order.

mod record;

pub use record::StoredValue;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::backend::Backend;
use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::flusher::Flusher;

// =============================================================================
// Shared State
// =============================================================================

/// State guarded by the single foreground/flusher mutex
struct State {
    /// Authoritative map of live keys to value records
    table: HashMap<String, StoredValue>,

    /// FIFO backlog of keys awaiting a durable write
    queue: VecDeque<String>,
}

/// Everything the foreground handle and the flusher thread share
pub(crate) struct Shared {
    /// Table + queue under one lock
    state: Mutex<State>,

    /// Wake signal for the flusher ("new work may be available")
    work_available: Condvar,

    /// Serializes whole flush cycles (see module docs)
    drain: Mutex<()>,

    /// The durable backend; held for one begin/commit bracket at a time
    backend: Mutex<Box<dyn Backend>>,

    /// Cooperative stop flag for the flusher, checked between cycles
    stop: AtomicBool,

    /// Max keys drained per backend bracket
    batch_size: usize,

    /// Completed drain batches (observability for tests and stats)
    flush_batches: AtomicU64,
}

impl Shared {
    fn new(backend: Box<dyn Backend>, batch_size: usize) -> Self {
        Self {
            state: Mutex::new(State {
                table: HashMap::new(),
                queue: VecDeque::new(),
            }),
            work_available: Condvar::new(),
            drain: Mutex::new(()),
            backend: Mutex::new(backend),
            stop: AtomicBool::new(false),
            // A zero batch would drain nothing and spin forever.
            batch_size: batch_size.max(1),
            flush_batches: AtomicU64::new(0),
        }
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Enqueue-if-needed. Lock is assumed to be held (callers pass the
    /// guarded state).
    ///
    /// - absent key (a delete just happened): always enqueue once
    /// - present and clean: mark dirty, enqueue once
    /// - present and dirty: already queued, do nothing
    fn mark_dirty(&self, state: &mut State, key: String) {
        match state.table.get_mut(&key) {
            Some(record) if record.is_dirty() => return,
            Some(record) => record.mark_dirty(),
            None => {}
        }
        state.queue.push_back(key);
        self.work_available.notify_one();
    }

    /// One flush cycle: detach the queue and drain it to empty.
    ///
    /// With an empty queue and `should_wait`, blocks on the condvar until
    /// signaled; a spurious wake simply returns and the caller loops.
    pub(crate) fn flush_cycle(&self, should_wait: bool) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.queue.is_empty() {
                // Stop is re-checked under the same lock the closer signals
                // under, so the shutdown wakeup cannot be lost.
                if should_wait && !self.stopped() {
                    self.work_available.wait(&mut state);
                }
                return Ok(());
            }
        }

        let _drain = self.drain.lock();

        // Swap the whole queue out so foreground mutations accumulate in a
        // fresh one while the detached backlog drains.
        let mut detached = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.queue)
        };
        if detached.is_empty() {
            // Another drain won the race while we waited for the drain lock.
            return Ok(());
        }

        while !detached.is_empty() {
            if let Err(e) = self.flush_some(&mut detached) {
                // The keys are still dirty in the table but their queue
                // entries were consumed by this drain; put the remainder
                // back so a later flush can still find them.
                let mut state = self.state.lock();
                state.queue.extend(detached.drain(..));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drain up to `batch_size` keys from the detached queue into one
    /// backend transaction.
    fn flush_some(&self, detached: &mut VecDeque<String>) -> Result<()> {
        let mut to_set: HashMap<String, Bytes> = HashMap::new();
        let mut to_delete: Vec<String> = Vec::new();

        // Phase one: re-check every popped key against the live table. The
        // key's value (or existence) may have changed between enqueue and
        // drain; the batch must carry the latest state, never a snapshot
        // taken at enqueue time.
        {
            let state = self.state.lock();
            for _ in 0..self.batch_size {
                let Some(key) = detached.pop_front() else { break };
                match state.table.get(&key) {
                    Some(record) if record.is_dirty() => {
                        // Same-key duplicates collapse to the latest value.
                        to_set.insert(key, record.value().clone());
                    }
                    // Already persisted by an earlier batch of this drain.
                    Some(_) => {}
                    None => to_delete.push(key),
                }
            }
        }

        if !(to_set.is_empty() && to_delete.is_empty()) {
            // Phase two: one begin/commit bracket, table lock released.
            // Deletes first in queue order; sets are per-key latest, so
            // their order is free.
            if let Err(e) = self.apply_batch(&to_delete, &to_set) {
                tracing::error!("backend batch failed: {e}");
                let mut state = self.state.lock();
                state.queue.extend(to_delete);
                state.queue.extend(to_set.into_keys());
                return Err(e);
            }

            tracing::debug!(
                "flushed batch: {} sets, {} deletes",
                to_set.len(),
                to_delete.len()
            );

            // Phase three: clean-after-commit. A record becomes clean only
            // if its value is still the one just persisted. Anything that
            // moved in flight stays dirty and goes back on the live queue:
            // a mutation of an already-dirty record skips its own enqueue,
            // and a key deleted in flight needs its removal queued for the
            // same reason. A delete-then-set during the flight can leave
            // the key queued already, so this may add a transient duplicate
            // entry; the drain re-check makes duplicates harmless.
            let mut requeued = false;
            {
                let mut guard = self.state.lock();
                let state = &mut *guard;
                for (key, persisted) in to_set {
                    match state.table.get_mut(&key) {
                        Some(record) if record.value() == &persisted => {
                            record.mark_clean();
                        }
                        _ => {
                            state.queue.push_back(key);
                            requeued = true;
                        }
                    }
                }
            }
            if requeued {
                self.work_available.notify_one();
            }
        }

        self.flush_batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Apply one batch under a begin/commit bracket.
    ///
    /// Any failure escalates to the caller; the store defines no
    /// rollback-and-retry policy.
    fn apply_batch(
        &self,
        to_delete: &[String],
        to_set: &HashMap<String, Bytes>,
    ) -> Result<()> {
        let mut backend = self.backend.lock();
        backend.begin()?;
        for key in to_delete {
            backend.del(key)?;
        }
        for (key, value) in to_set {
            backend.set(key, value.clone())?;
        }
        backend.commit()
    }
}

// =============================================================================
// Store Orchestrator
// =============================================================================

/// The write-back store.
///
/// Mutations apply to memory and return immediately; a background flusher
/// propagates them to the backend in bounded transactional batches. Once
/// `set`/`delete` returns, the mutation is guaranteed to be queued for
/// persistence; durability lags behind.
///
/// The store is `Send + Sync` and internally locked, so it can be shared
/// across threads via `Arc` without external synchronization.
pub struct WriteBackStore {
    shared: Arc<Shared>,

    /// Whether `close()`/`Drop` flush to quiescence before stopping
    flush_on_close: bool,

    /// Flusher join handle, taken exactly once on shutdown
    flusher: Option<JoinHandle<Result<()>>>,
}

impl WriteBackStore {
    /// Open a store over the given backend and start its flusher.
    ///
    /// Spawning the flusher thread is the final fallible step, so this
    /// either returns a fully running store or an explicit
    /// [`DriftError::FlusherStart`] with nothing left half-initialized.
    pub fn open(backend: impl Backend + 'static, config: Config) -> Result<Self> {
        let shared = Arc::new(Shared::new(Box::new(backend), config.flush_batch_size));

        let flusher = Flusher::new(Arc::clone(&shared));
        let handle = thread::Builder::new()
            .name(config.flusher_thread_name)
            .spawn(move || flusher.run())
            .map_err(DriftError::FlusherStart)?;

        Ok(Self {
            shared,
            flush_on_close: config.flush_on_close,
            flusher: Some(handle),
        })
    }

    /// Open with the default config (convenience method)
    pub fn open_default(backend: impl Backend + 'static) -> Result<Self> {
        Self::open(backend, Config::default())
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Set a key to a value.
    ///
    /// Steps:
    /// 1. Replace any existing record, inheriting its dirty flag
    /// 2. Enqueue-if-needed and signal the flusher
    /// 3. Return success synchronously; no backend access on this path
    ///
    /// Always returns true: the in-memory mutation cannot fail, and the
    /// return value is the operation's completion notification.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Bytes>) -> bool {
        let key = key.into();
        let value = value.into();

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        // A key that was already dirty is already queued; the fresh record
        // starts dirty so mark_dirty skips the duplicate enqueue.
        let was_dirty = state
            .table
            .get(&key)
            .map(|record| record.is_dirty())
            .unwrap_or(false);
        state
            .table
            .insert(key.clone(), StoredValue::new(value, was_dirty));
        self.shared.mark_dirty(state, key);
        true
    }

    /// Get the current in-memory value for a key.
    ///
    /// A miss is final: the store never consults the backend, so a key
    /// that exists durably but was never written through this store
    /// instance reports `None`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.shared
            .state
            .lock()
            .table
            .get(key)
            .map(|record| record.value().clone())
    }

    /// Delete a key. Returns whether it existed in memory.
    ///
    /// The record is discarded from memory immediately; the durable
    /// removal happens later via the flush cycle.
    pub fn delete(&self, key: &str) -> bool {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        if !state.table.contains_key(key) {
            return false;
        }
        // Enqueue before removal: a clean record needs its (now pending)
        // removal queued; a dirty one is already represented.
        self.shared.mark_dirty(state, key.to_string());
        state.table.remove(key);
        true
    }

    /// Flush to quiescence: run non-waiting flush cycles until the queue
    /// is observed empty.
    ///
    /// With concurrent writers this only guarantees that every mutation
    /// accepted before the call is durable.
    pub fn flush(&self) -> Result<()> {
        loop {
            self.shared.flush_cycle(false)?;
            // A detached queue leaves the live queue empty while its
            // batches are still applying on the flusher thread; holding
            // the drain lock waits out any such in-flight drain before
            // the emptiness check means anything.
            let _drain = self.shared.drain.lock();
            if self.shared.state.lock().queue.is_empty() {
                return Ok(());
            }
        }
    }

    /// Wipe the store and its backend.
    ///
    /// Steps:
    /// 1. Flush everything pending so no batch is in flight
    /// 2. Under the table lock: reset the backend, discard the queue,
    ///    clear the table
    ///
    /// Afterwards the store is in its just-constructed state and the
    /// backend holds nothing, so no divergence exists. Idempotent.
    pub fn reset(&self) -> Result<()> {
        self.flush()?;

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        self.shared.backend.lock().reset()?;
        state.queue = VecDeque::new();
        state.table.clear();
        Ok(())
    }

    /// Close the store gracefully.
    ///
    /// Flushes to quiescence (unless `flush_on_close` is disabled), stops
    /// the flusher, joins it, and surfaces any error its loop returned.
    pub fn close(mut self) -> Result<()> {
        let flush_result = if self.flush_on_close {
            self.flush()
        } else {
            Ok(())
        };
        let shutdown_result = self.shutdown_flusher();
        flush_result.and(shutdown_result)
    }

    /// Stop and join the flusher, surfacing its loop result.
    fn shutdown_flusher(&mut self) -> Result<()> {
        let Some(handle) = self.flusher.take() else {
            return Ok(());
        };

        {
            // Raise stop under the state lock: the flusher re-checks the
            // flag under this lock before waiting, so the wakeup cannot
            // fall between its check and its wait.
            let _state = self.shared.state.lock();
            self.shared.stop.store(true, Ordering::Release);
            self.shared.work_available.notify_all();
        }

        handle.join().map_err(|_| DriftError::FlusherPanicked)?
    }

    // =========================================================================
    // Accessors (for testing and stats)
    // =========================================================================

    /// Number of live keys in memory
    pub fn len(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    /// True if no live keys exist in memory
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().table.is_empty()
    }

    /// Number of keys currently queued for persistence
    pub fn pending_writes(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Number of drain batches completed so far
    pub fn flush_batches(&self) -> u64 {
        self.shared.flush_batches.load(Ordering::Relaxed)
    }
}

impl Drop for WriteBackStore {
    fn drop(&mut self) {
        if self.flusher.is_none() {
            return; // close() already ran
        }
        if self.flush_on_close {
            if let Err(e) = self.flush() {
                tracing::warn!("flush on drop failed: {e}");
            }
        }
        if let Err(e) = self.shutdown_flusher() {
            tracing::error!("flusher terminated with error: {e}");
        }
    }
}
