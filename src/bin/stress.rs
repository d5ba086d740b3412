//! driftkv Stress Driver
//!
//! Hammers a store over the in-memory reference backend from several
//! threads, flushes to quiescence, and verifies memory/backend agreement.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use driftkv::{Config, MemoryBackend, WriteBackStore};
use tracing_subscriber::{fmt, EnvFilter};

/// driftkv stress driver
#[derive(Parser, Debug)]
#[command(name = "driftkv-stress")]
#[command(about = "Write-back store stress driver")]
#[command(version)]
struct Args {
    /// Operations per writer thread
    #[arg(short, long, default_value = "100000")]
    ops: usize,

    /// Number of writer threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Value size in bytes
    #[arg(short = 's', long, default_value = "64")]
    value_size: usize,

    /// Delete every Nth key after setting it (0 disables deletes)
    #[arg(short, long, default_value = "10")]
    delete_every: usize,

    /// Flush batch size
    #[arg(short, long, default_value = "1000")]
    batch_size: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("driftkv stress v{}", driftkv::VERSION);
    tracing::info!(
        "{} threads x {} ops, {}-byte values, delete every {}",
        args.threads,
        args.ops,
        args.value_size,
        args.delete_every
    );

    let config = Config::builder()
        .flush_batch_size(args.batch_size)
        .build();

    let backend = MemoryBackend::new();
    let store = match WriteBackStore::open(backend.clone(), config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let value = vec![0xABu8; args.value_size];

    let mut handles = vec![];
    for t in 0..args.threads {
        let store = Arc::clone(&store);
        let value = value.clone();
        let ops = args.ops;
        let delete_every = args.delete_every;
        handles.push(std::thread::spawn(move || {
            for i in 0..ops {
                let key = format!("thread{t}_key{i}");
                store.set(key.clone(), value.clone());
                if delete_every != 0 && i % delete_every == 0 {
                    store.delete(&key);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let write_elapsed = start.elapsed();
    let total_ops = args.threads * args.ops;
    tracing::info!(
        "wrote {} ops in {:.2?} ({:.0} ops/s), {} pending",
        total_ops,
        write_elapsed,
        total_ops as f64 / write_elapsed.as_secs_f64(),
        store.pending_writes()
    );

    let flush_start = Instant::now();
    if let Err(e) = store.flush() {
        tracing::error!("flush failed: {}", e);
        std::process::exit(1);
    }
    tracing::info!(
        "flushed to quiescence in {:.2?} ({} batches)",
        flush_start.elapsed(),
        store.flush_batches()
    );

    // Every surviving key must be committed; every deleted key must be gone.
    if backend.len() != store.len() {
        tracing::error!(
            "divergence: {} keys in memory, {} committed",
            store.len(),
            backend.len()
        );
        std::process::exit(1);
    }
    tracing::info!("verified: {} keys committed, no divergence", backend.len());

    let store = Arc::try_unwrap(store).unwrap_or_else(|_| unreachable!());
    if let Err(e) = store.close() {
        tracing::error!("close failed: {}", e);
        std::process::exit(1);
    }
    tracing::info!("store closed");
}
