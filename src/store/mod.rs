//! The shared record store.
//!
//! [`RecordStore`] holds every ingested line, linked both in global arrival order and in
//! per-book order, together with the title registry and the frequency map.
//! [`SharedStore`] is the handle that connection handlers and analysis workers clone; every
//! operation on it takes the same exclusive lock, so appends, title updates, frequency
//! refreshes and ranking snapshots are all serialized with respect to one another.
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::Pattern;

mod records;

pub use self::records::{BookId, Record, RecordId, RecordStore};

/// placeholder rendered for books that never sent a title line
pub const UNKNOWN_TITLE: &str = "Unknown Book";

/// One row of a frequency ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    /// the ranked book
    pub book: BookId,
    /// the book's title, `None` if no title line was received
    pub title: Option<String>,
    /// occurrences of the pattern in the book
    pub count: usize,
}

impl RankEntry {
    /// the title to display, falling back to [`UNKNOWN_TITLE`]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }
}

/// A cloneable, thread safe handle to a single [`RecordStore`].
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<RecordStore>>,
}

impl SharedStore {
    /// creates a handle to a new, empty store
    pub fn new() -> Self {
        SharedStore::default()
    }

    /// appends one line to `book`
    pub fn append(&self, text: impl Into<String>, book: BookId) {
        let text = text.into();
        let mut store = self.inner.lock();
        debug!("added record from {}: {}", book, text);
        store.append(text, book);
    }

    /// records or overwrites the title of `book`
    pub fn set_title(&self, book: BookId, title: impl Into<String>) {
        self.inner.lock().set_title(book, title);
    }

    /// the title of `book`, if one was registered
    pub fn title(&self, book: BookId) -> Option<String> {
        self.inner.lock().title(book).map(String::from)
    }

    /// occurrences of `pattern` in `book`, 0 for an unknown book
    pub fn pattern_count(&self, book: BookId, pattern: &Pattern) -> usize {
        self.inner.lock().pattern_count(book, pattern)
    }

    /// recomputes and stores (or removes) the frequency of `pattern` in `book`
    pub fn refresh_frequency(&self, book: BookId, pattern: &Pattern) -> usize {
        self.inner.lock().refresh_frequency(book, pattern)
    }

    /// the current frequency of `book`
    pub fn frequency(&self, book: BookId) -> Option<usize> {
        self.inner.lock().frequency(book)
    }

    /// a point-in-time snapshot of the frequency map, highest count first
    pub fn ranked_by_frequency(&self) -> Vec<(BookId, usize)> {
        self.inner.lock().ranked_by_frequency()
    }

    /// like [`ranked_by_frequency`](Self::ranked_by_frequency), with titles resolved under
    /// the same lock
    pub fn ranking(&self) -> Vec<RankEntry> {
        let store = self.inner.lock();
        store
            .ranked_by_frequency()
            .into_iter()
            .map(|(book, count)| RankEntry {
                book,
                title: store.title(book).map(String::from),
                count,
            })
            .collect()
    }

    /// a copy of `book`'s lines in append order
    pub fn book_lines(&self, book: BookId) -> Vec<String> {
        self.inner.lock().book_lines(book).map(String::from).collect()
    }

    /// a copy of every line in global arrival order
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines().map(String::from).collect()
    }

    /// total number of records
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// returns `true` if no record was appended yet
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
