//! Rayon thread pool configuration for batch simulation.
//!
//! Use [WorkerPool::install] to run batches on a fixed number of threads, or rely on
//! Rayon's default (all CPU cores).

use std::env;

use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};

/// Environment variable read by [WorkerPool::from_env].
pub const WORKERS_ENV: &str = "BROADSIDE_WORKERS";

/// Configures how many worker threads are used for parallel batch execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use Rayon default (num_cpus).
    pub workers: usize,
}

impl WorkerPool {
    /// Use exactly `n` worker threads.
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Worker count from `BROADSIDE_WORKERS`; unset or unparsable means all cores.
    pub fn from_env() -> Self {
        let workers = match env::var(WORKERS_ENV) {
            Ok(raw) => raw.trim().parse::<usize>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid {WORKERS_ENV}, using all cores");
                0
            }),
            Err(_) => 0,
        };
        Self { workers }
    }

    /// Run a closure on a pool with this worker count. With 0 workers this is the global
    /// Rayon pool; otherwise a temporary pool is built for the call.
    pub fn install<F, R>(&self, f: F) -> Result<R, ThreadPoolBuildError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            Ok(f())
        } else {
            let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
            Ok(pool.install(f))
        }
    }
}
