use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The process-wide running flag, shared by the server and every analysis worker.
///
/// Workers poll it once per loop iteration, so shutdown latency is bounded by their
/// dequeue wait.
#[derive(Debug, Clone)]
pub struct Shutdown {
    running: Arc<AtomicBool>,
}

impl Shutdown {
    /// creates a token in the running state
    pub fn new() -> Self {
        Shutdown {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// returns `true` until [`trigger`](Self::trigger) is called on any clone
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// clears the running flag
    pub fn trigger(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Shutdown::new()
    }
}
