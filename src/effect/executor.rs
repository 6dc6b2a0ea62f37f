//! Executor - the caller-owned thread pool boundary.
//!
//! The core never creates threads. Every concurrent combinator
//! (`fork`, `par_zip`, `either`, `timeout`) takes an executor supplied and
//! owned by the caller; each forked evaluation pins one worker for its
//! duration, including time spent blocked at suspension points. Size the
//! pool accordingly.

use std::fmt;

/// A sink for ready-to-run tasks backed by a caller-owned thread pool.
///
/// `execute` must not block on the task's completion: forking relies on
/// submission returning promptly.
///
/// # Examples
///
/// Adapting a tokio runtime (`async` feature):
///
/// ```rust
/// use std::sync::Arc;
/// use effectus::effect::Executor;
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// let executor: Arc<dyn Executor> = Arc::new(runtime);
/// executor.execute(Box::new(|| println!("running on the pool")));
/// ```
pub trait Executor: Send + Sync {
    /// Submits a task for execution on the pool.
    fn execute(&self, task: Box<dyn FnOnce() + Send>);
}

impl fmt::Debug for dyn Executor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Executor").finish_non_exhaustive()
    }
}

// =============================================================================
// Tokio Adapter (requires async feature)
// =============================================================================

/// Runs tasks on tokio's blocking pool, which tolerates workers that park
/// at suspension points.
#[cfg(feature = "async")]
impl Executor for tokio::runtime::Handle {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        drop(self.spawn_blocking(task));
    }
}

#[cfg(feature = "async")]
impl Executor for tokio::runtime::Runtime {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        drop(self.handle().spawn_blocking(task));
    }
}

// =============================================================================
// Rayon Adapter (requires rayon feature)
// =============================================================================

/// Runs tasks on a rayon pool. Rayon workers are a fixed set: evaluations
/// that block at suspension points can starve the pool if fibers
/// outnumber threads.
#[cfg(feature = "rayon")]
impl Executor for rayon::ThreadPool {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        self.spawn(task);
    }
}
