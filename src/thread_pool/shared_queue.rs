use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, instrument};

use super::{Occupancy, ThreadPool};
use crate::Result;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool implemented with a shared job queue (i.e. channel).
///
/// This implementation uses the MPMC [`channel`] provided by the crossbeam crate.
/// Specifically, we are using it as a single producer, multiple consumer. The single producer
/// is the accept loop, and the threads in the pool are the consumers.
///
/// Connections beyond the number of threads wait in the queue, and a warning is logged.
///
/// If a connection handler panics, the old thread will be destroyed and a new one will be
/// created. Failures to create that replacement thread are only logged, so the thread number
/// in the pool can decrease to zero, then spawning a job will log an error and drop the job.
///
/// [`channel`]: https://docs.rs/crossbeam/0.8.1/crossbeam/channel/index.html
#[derive(Debug)]
pub struct SharedQueueThreadPool {
    /// the sending part of the channel
    tx: Sender<Job>,
    occupancy: Occupancy,
}

impl ThreadPool for SharedQueueThreadPool {
    /// create a new "thread pool" with the given number of `threads`.
    /// Every thread created will have a handle to the receiving end of the channel
    fn new(threads: u32) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<Job>();
        for n in 0..threads {
            let task_rx = TaskReceiver(rx.clone());
            thread::Builder::new()
                .name(format!("connection-{}", n))
                .spawn(move || run_tasks(task_rx))?;
        }
        Ok(SharedQueueThreadPool {
            tx,
            occupancy: Occupancy::new(threads as usize),
        })
    }

    /// Queues a job for the next idle thread.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(self.occupancy.track(job))).is_err() {
            error!("There are no threads in the pool, dropping the job");
        }
    }
}

/// A type that can receive jobs (i.e. closures) from a channel and run them.
/// Additionally, this type is responsible for restarting any threads that panicked
#[derive(Clone)]
struct TaskReceiver(Receiver<Job>);

impl std::fmt::Debug for TaskReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskReceiver")
            .field("queued", &self.0.len())
            .finish()
    }
}

impl Drop for TaskReceiver {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!("thread panicked, starting a new thread");
            let task_rx = self.clone();
            if let Err(e) = thread::Builder::new().spawn(move || run_tasks(task_rx)) {
                error!("Failed to spawn a thread: {}", e);
            }
        }
    }
}

/// this function waits for a job to arrive on its (wrapped) receiver, and then runs the job
#[instrument]
fn run_tasks(rx: TaskReceiver) {
    loop {
        match rx.0.recv() {
            Ok(task) => {
                debug!("received a new job");
                task();
            }
            Err(_) => {
                debug!("Thread exited because the thread pool was destroyed.");
                break;
            }
        }
    }
}
