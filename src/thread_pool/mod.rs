//! Thread pools that run connection handlers.
//!
//! Every accepted connection becomes one job on a [`ThreadPool`]. Which implementation is
//! used decides how many connections can be ingested at the same time:
//! - [`NaiveThreadPool`] starts a new thread for every connection
//! - [`SharedQueueThreadPool`] runs at most `threads` connections, later ones wait in a queue
//! - [`RayonThreadPool`] does the same on a rayon work-stealing pool
//!
//! A waiting connection is accepted but not read, so its book stays out of the ranking until
//! a thread frees up. The capped pools log a warning whenever that happens.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::Result;

mod naive;
mod rayon_pool;
mod shared_queue;

pub use self::naive::NaiveThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;

/// The trait every connection thread pool implements
pub trait ThreadPool {
    /// Creates a new thread pool, immediately spawning the specified number of threads.
    ///
    /// # Errors
    /// Returns an error if any thread fails to spawn. All previously-spawned threads are
    /// terminated.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool.
    ///
    /// Spawning always succeeds, but if the function panics the thread pool continues to
    /// operate with the same number of threads.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

/// Counts the jobs handed to a pool with a fixed number of threads that have not finished.
#[derive(Debug, Clone)]
pub(crate) struct Occupancy {
    threads: usize,
    taken: Arc<AtomicUsize>,
}

impl Occupancy {
    pub(crate) fn new(threads: usize) -> Self {
        Occupancy {
            threads,
            taken: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// wraps `job` so that it is counted until it returns or unwinds
    pub(crate) fn track<F>(&self, job: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() + Send + 'static,
    {
        let taken = self.taken.fetch_add(1, Ordering::SeqCst);
        if taken >= self.threads {
            warn!(
                "all {} connection threads are busy, the new connection waits for one to close",
                self.threads
            );
        }
        let slot = Slot(Arc::clone(&self.taken));
        move || {
            let _slot = slot;
            job()
        }
    }
}

// released when the job finishes, panics, or is dropped without running
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
