use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::store::BookId;

/// An unbounded, multi-producer multi-consumer FIFO of books awaiting re-analysis.
///
/// This wraps the MPMC [`channel`] provided by the crossbeam crate. Connection handlers push
/// book ids, analysis workers pop them. Duplicate ids are fine, they only cause a redundant
/// recount.
///
/// [`channel`]: https://docs.rs/crossbeam/0.8.1/crossbeam/channel/index.html
#[derive(Debug, Clone)]
pub struct AnalysisQueue {
    tx: Sender<BookId>,
    rx: Receiver<BookId>,
}

impl AnalysisQueue {
    /// creates a new, empty queue
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        AnalysisQueue { tx, rx }
    }

    /// enqueues `book`, never blocks
    pub fn push(&self, book: BookId) {
        // both channel ends live in `self`, so the channel cannot be disconnected here
        let _ = self.tx.send(book);
    }

    /// waits up to `timeout` for the next book. `None` means the wait elapsed.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<BookId> {
        match self.rx.recv_timeout(timeout) {
            Ok(book) => Some(book),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// number of queued ids
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// returns `true` if nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for AnalysisQueue {
    fn default() -> Self {
        AnalysisQueue::new()
    }
}
