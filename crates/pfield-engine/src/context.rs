//! Process-lifetime run context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::SimulationError;

/// Resources shared by the whole run: the worker pool partitions are
/// assembled on, and the cooperative termination flag.
///
/// Created once by the driver and passed by reference to
/// [`Simulation::init`](crate::Simulation::init) and
/// [`Simulation::solve`](crate::Simulation::solve).
pub struct RunContext {
    pool: ThreadPool,
    terminate: Arc<AtomicBool>,
}

impl RunContext {
    /// Start a pool of `threads` workers, or one per core if `None`.
    pub fn new(threads: Option<usize>) -> Result<Self, SimulationError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("pfield-worker-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool,
            terminate: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `f` with this context's pool as the rayon pool.
    pub fn install<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(f)
    }

    /// Ask the run to stop before its next step.
    pub fn request_termination(&self) {
        self.terminate.store(true, Ordering::Release);
    }

    /// Whether termination has been requested.
    pub fn termination_requested(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    /// Shared handle to the flag, for signal handlers or other threads.
    pub fn termination_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_is_honoured() {
        let ctx = RunContext::new(Some(2)).unwrap();
        assert_eq!(ctx.threads(), 2);
        assert_eq!(ctx.install(rayon::current_num_threads), 2);
    }

    #[test]
    fn termination_flag_is_shared() {
        let ctx = RunContext::new(Some(1)).unwrap();
        assert!(!ctx.termination_requested());
        ctx.termination_flag().store(true, Ordering::Release);
        assert!(ctx.termination_requested());
    }
}
