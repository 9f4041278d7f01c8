use std::collections::HashMap;
use std::fmt;

use crate::config::Pattern;

/// Identifies one book, i.e. the lines received over one connection.
/// Ids are handed out by the server starting at 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "book_{:02}", self.0)
    }
}

/// position of a [`Record`] in global arrival order
pub type RecordId = usize;

/// One ingested line, tagged with the book it belongs to. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    text: String,
    book: BookId,
}

impl Record {
    /// the line's text, without its terminator
    pub fn text(&self) -> &str {
        &self.text
    }

    /// the book this line was received for
    pub fn book(&self) -> BookId {
        self.book
    }
}

// a frequency map entry, `seq` is the order in which the book entered the map
#[derive(Debug, Copy, Clone)]
struct Frequency {
    seq: u64,
    count: usize,
}

/// The append-only record store.
///
/// Records live in one arena whose order is the global arrival order. Each book keeps the
/// arena indices of its own records, so appending to either sequence is O(1) and a record
/// always belongs to exactly one book sequence.
///
/// This type is not synchronized; [`SharedStore`](super::SharedStore) puts it behind a lock.
#[derive(Debug, Default)]
pub struct RecordStore {
    // every record, in arrival order
    records: Vec<Record>,

    // book id -> indices into `records`, in the order the book's lines arrived
    books: HashMap<BookId, Vec<RecordId>>,

    titles: HashMap<BookId, String>,

    // only books with a strictly positive count are present
    frequency: HashMap<BookId, Frequency>,

    // next insertion sequence number for `frequency`
    next_seq: u64,
}

impl RecordStore {
    /// creates an empty store
    pub fn new() -> Self {
        RecordStore::default()
    }

    /// appends `text` to the end of the global sequence and to the end of `book`'s sequence
    pub fn append(&mut self, text: impl Into<String>, book: BookId) -> RecordId {
        let id = self.records.len();
        self.records.push(Record {
            text: text.into(),
            book,
        });
        self.books.entry(book).or_default().push(id);
        id
    }

    /// records or overwrites the title of `book`
    pub fn set_title(&mut self, book: BookId, title: impl Into<String>) {
        self.titles.insert(book, title.into());
    }

    /// the title of `book`, if one was registered
    pub fn title(&self, book: BookId) -> Option<&str> {
        self.titles.get(&book).map(String::as_str)
    }

    /// total number of records across all books
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// returns `true` if no record was appended yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// every record in global arrival order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// every line in global arrival order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(Record::text)
    }

    /// the lines of `book` in the order they were appended. Empty for an unknown book.
    pub fn book_lines(&self, book: BookId) -> impl Iterator<Item = &str> {
        self.books
            .get(&book)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&id| self.records[id].text())
    }

    /// the ids of every book that has at least one record
    pub fn books(&self) -> Vec<BookId> {
        let mut books: Vec<BookId> = self.books.keys().copied().collect();
        books.sort();
        books
    }

    /// sums the non-overlapping occurrences of `pattern` in each of `book`'s lines.
    /// Occurrences spanning two lines are not counted. Returns 0 for an unknown book.
    pub fn pattern_count(&self, book: BookId, pattern: &Pattern) -> usize {
        self.book_lines(book).map(|line| pattern.count_in(line)).sum()
    }

    /// recomputes the frequency of `pattern` in `book`.
    /// A positive count is stored, a zero count removes the book from the frequency map.
    /// Returns the new count.
    pub fn refresh_frequency(&mut self, book: BookId, pattern: &Pattern) -> usize {
        let count = self.pattern_count(book, pattern);
        self.set_frequency(book, count);
        count
    }

    /// the current frequency of `book`, `None` if it is not in the frequency map
    pub fn frequency(&self, book: BookId) -> Option<usize> {
        self.frequency.get(&book).map(|f| f.count)
    }

    /// stores `count` for `book`, keeping the book's original insertion position if present.
    /// A zero count removes the entry.
    fn set_frequency(&mut self, book: BookId, count: usize) {
        if count == 0 {
            self.frequency.remove(&book);
            return;
        }
        match self.frequency.get_mut(&book) {
            Some(entry) => entry.count = count,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.frequency.insert(book, Frequency { seq, count });
            }
        }
    }

    /// a snapshot of the frequency map ordered by count, highest first.
    /// Books with equal counts keep the order in which they entered the map.
    pub fn ranked_by_frequency(&self) -> Vec<(BookId, usize)> {
        let mut entries: Vec<(BookId, Frequency)> =
            self.frequency.iter().map(|(b, f)| (*b, *f)).collect();
        entries.sort_by(|(_, a), (_, b)| b.count.cmp(&a.count).then(a.seq.cmp(&b.seq)));
        entries.into_iter().map(|(b, f)| (b, f.count)).collect()
    }
}
