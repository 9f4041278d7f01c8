use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::error;

use super::ThreadPool;
use crate::Result;

/// a simple thread-pool that is not actually a pool. It starts a new thread on every spawn
/// request, so every connection gets its own long-lived thread
#[derive(Debug)]
pub struct NaiveThreadPool {
    // number of threads started so far, used to name them
    spawned: AtomicU64,
}

impl ThreadPool for NaiveThreadPool {
    fn new(_threads: u32) -> Result<Self> {
        Ok(NaiveThreadPool {
            spawned: AtomicU64::new(0),
        })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = thread::Builder::new()
            .name(format!("connection-{}", n))
            .spawn(job)
        {
            error!("Failed to spawn a thread: {}", e);
        }
    }
}
