//! Analysis workers.
//!
//! A fixed number of workers is started with the server. Each one repeatedly waits (up to
//! one report interval) for a book id on the [`AnalysisQueue`], recounts the pattern in that
//! book, and then gives the [`Reporter`] a chance to print the ranking.
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, instrument, warn};

use crate::config::Pattern;
use crate::error::Result;
use crate::queue::AnalysisQueue;
use crate::report::Reporter;
use crate::shutdown::Shutdown;
use crate::store::SharedStore;

/// Everything one analysis worker needs, each field is a cheap clone of a shared handle.
#[derive(Debug)]
pub struct AnalysisWorker<W> {
    store: SharedStore,
    queue: AnalysisQueue,
    pattern: Pattern,
    reporter: Arc<Reporter<W>>,
    shutdown: Shutdown,
}

impl<W: Write> AnalysisWorker<W> {
    /// creates a worker over the given shared handles
    pub fn new(
        store: SharedStore,
        queue: AnalysisQueue,
        pattern: Pattern,
        reporter: Arc<Reporter<W>>,
        shutdown: Shutdown,
    ) -> Self {
        AnalysisWorker {
            store,
            queue,
            pattern,
            reporter,
            shutdown,
        }
    }

    /// runs one iteration: a bounded dequeue, a refresh if a book arrived, then a report
    /// if one is due. Returns `true` if a book was refreshed.
    pub fn step(&self) -> bool {
        let refreshed = match self.queue.pop_timeout(self.reporter.interval()) {
            Some(book) => {
                let count = self.store.refresh_frequency(book, &self.pattern);
                debug!("{} now has {} occurrences of {:?}", book, count, self.pattern.as_str());
                true
            }
            None => false,
        };

        if let Err(e) = self.reporter.report_if_due(&self.store) {
            warn!("could not write the frequency report: {}", e);
        }
        refreshed
    }

    /// loops over [`step`](Self::step) until shutdown is triggered
    pub fn run(self) {
        while self.shutdown.is_running() {
            self.step();
        }
        debug!("analysis worker stopped");
    }
}

/// The running analysis workers.
#[derive(Debug)]
pub struct AnalysisPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: Shutdown,
}

impl AnalysisPool {
    /// starts `workers` analysis threads that stop once `shutdown` is triggered
    #[instrument(skip(store, queue, reporter, shutdown))]
    pub fn spawn<W>(
        workers: usize,
        store: SharedStore,
        queue: AnalysisQueue,
        pattern: Pattern,
        reporter: Arc<Reporter<W>>,
        shutdown: Shutdown,
    ) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let worker = AnalysisWorker::new(
                store.clone(),
                queue.clone(),
                pattern.clone(),
                Arc::clone(&reporter),
                shutdown.clone(),
            );
            let handle = thread::Builder::new()
                .name(format!("analysis-{}", n))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }
        debug!("started {} analysis workers", handles.len());
        Ok(AnalysisPool { handles, shutdown })
    }

    /// number of worker threads
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// returns `true` if the pool has no worker
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// triggers shutdown and waits for every worker to finish its current wait and exit
    pub fn shutdown(self) {
        self.shutdown.trigger();
        self.join();
    }

    /// waits for every worker to exit, without triggering shutdown
    pub fn join(self) {
        for handle in self.handles {
            let name = handle.thread().name().map(String::from);
            if handle.join().is_err() {
                error!("analysis worker {:?} panicked", name);
            }
        }
    }
}
