//! Bounded CPU pool for blocking renders.
//!
//! Renders are synchronous and CPU-bound, so they run on a dedicated rayon
//! pool instead of the global one. Size is the configured `workers`, or
//! twice the available parallelism.

use rayon::prelude::*;

use crate::constants::WORKERS_PER_CORE;
use crate::error::ServiceError;

#[derive(Debug)]
pub struct RenderPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl RenderPool {
    pub fn new(workers: Option<usize>) -> Result<Self, ServiceError> {
        let size = workers.unwrap_or_else(default_pool_size).max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("inkmark-render-{}", i))
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build render pool: {}", e)))?;

        tracing::debug!(threads = size, "render pool started");
        Ok(Self { pool, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `f` over `items` on the pool. Results keep the input order.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}

/// `WORKERS_PER_CORE` × available parallelism.
pub fn default_pool_size() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores * WORKERS_PER_CORE
}
