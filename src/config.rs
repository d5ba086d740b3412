//! Configuration for driftkv
//!
//! Centralized configuration with sensible defaults.

/// Main configuration for a driftkv store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Flush Configuration
    // -------------------------------------------------------------------------
    /// Max number of keys drained from the detached queue per batch
    /// (one backend begin/commit bracket per batch)
    pub flush_batch_size: usize,

    /// Whether `close()` flushes the store to quiescence before stopping
    /// the flusher
    pub flush_on_close: bool,

    // -------------------------------------------------------------------------
    // Flusher Thread Configuration
    // -------------------------------------------------------------------------
    /// Name given to the background flusher thread
    pub flusher_thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_batch_size: 1000,
            flush_on_close: true,
            flusher_thread_name: "driftkv-flusher".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the per-batch drain limit
    pub fn flush_batch_size(mut self, size: usize) -> Self {
        self.config.flush_batch_size = size;
        self
    }

    /// Set whether `close()` flushes pending writes before stopping
    pub fn flush_on_close(mut self, flush: bool) -> Self {
        self.config.flush_on_close = flush;
        self
    }

    /// Set the flusher thread name
    pub fn flusher_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.flusher_thread_name = name.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
