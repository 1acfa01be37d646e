//! Execution contexts.
//!
//! A [`ListSynchronizer`](crate::ListSynchronizer) needs two of them:
//! - a **worker** context where diffs are computed (`WorkerPool`, `Inline`)
//! - a **presentation** context where results are applied (`MainQueue`, `Inline`)
//!
//! The presentation context must run its tasks one at a time and in
//! submission order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs tasks, now or later, on some thread.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    #[inline]
    fn execute(&self, task: Task) {
        (**self).execute(task);
    }
}

// =============================================================================
// Inline
// =============================================================================

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Executor for Inline {
    #[inline]
    fn execute(&self, task: Task) {
        task();
    }
}

// =============================================================================
// WorkerPool (parallel feature)
// =============================================================================

#[cfg(feature = "parallel")]
mod pool {
    use super::{Executor, Task};
    use crate::error::{SyncError, SyncResult};

    /// Background pool for diff computation, backed by rayon.
    pub struct WorkerPool {
        pool: Option<rayon::ThreadPool>,
    }

    impl WorkerPool {
        /// Dedicated pool with `threads` workers.
        pub fn new(threads: usize) -> SyncResult<Self> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("rowsync-worker-{i}"))
                .build()
                .map_err(|e| SyncError::Executor(e.to_string()))?;
            Ok(Self { pool: Some(pool) })
        }

        /// Share rayon's global pool.
        pub fn global() -> Self {
            Self { pool: None }
        }

        /// Number of worker threads.
        pub fn threads(&self) -> usize {
            match &self.pool {
                Some(pool) => pool.current_num_threads(),
                None => rayon::current_num_threads(),
            }
        }
    }

    impl Default for WorkerPool {
        fn default() -> Self {
            Self::global()
        }
    }

    impl std::fmt::Debug for WorkerPool {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("WorkerPool")
                .field("dedicated", &self.pool.is_some())
                .field("threads", &self.threads())
                .finish()
        }
    }

    impl Executor for WorkerPool {
        fn execute(&self, task: Task) {
            match &self.pool {
                Some(pool) => pool.spawn(task),
                None => rayon::spawn(task),
            }
        }
    }
}

#[cfg(feature = "parallel")]
pub use pool::WorkerPool;

// =============================================================================
// MainQueue
// =============================================================================

/// Single-consumer task queue standing in for a UI thread.
///
/// Any thread may post; only the thread that calls [`run_pending`] or
/// [`run_for`] executes tasks. Handles are cheap to clone and share one
/// `crossbeam_channel` queue.
///
/// [`run_pending`]: MainQueue::run_pending
/// [`run_for`]: MainQueue::run_for
#[derive(Clone)]
pub struct MainQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainQueue").field("pending", &self.pending()).finish()
    }
}

impl MainQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run queued tasks until the queue is empty, including tasks posted
    /// while running. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block until at least `min_tasks` tasks have run or `timeout` passes,
    /// then drain whatever else is queued. Returns how many ran.
    pub fn run_for(&self, min_tasks: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = self.run_pending();

        while ran < min_tasks {
            match self.rx.recv_deadline(deadline) {
                Ok(task) => {
                    task();
                    ran += 1 + self.run_pending();
                }
                Err(_) => break,
            }
        }

        ran
    }
}

impl Executor for MainQueue {
    fn execute(&self, task: Task) {
        // Every handle holds the receiver, so the queue never disconnects
        let _ = self.tx.send(task);
    }
}
