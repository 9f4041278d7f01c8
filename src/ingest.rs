//! Ingestion of one connection's byte stream.
//!
//! An [`IngestionHandler`] reads chunks from its connection, turns them into lines with a
//! [`LineDecoder`], appends every line to the [`SharedStore`] and queues its book for
//! re-analysis. When the stream ends (or fails) the book is handed to a [`BookDrain`].
use std::io::{self, ErrorKind, Read};

use tracing::{debug, error, info, warn};

use crate::drain::BookDrain;
use crate::queue::AnalysisQueue;
use crate::store::{BookId, SharedStore};

/// lines starting with this marker (and containing a `:`) carry the book's title
pub const TITLE_MARKER: &str = "Title";

// bytes requested from the connection per read
const CHUNK_SIZE: usize = 1024;

/// extracts the title from a line such as `Title: Moby Dick`
pub fn parse_title(line: &str) -> Option<&str> {
    if !line.starts_with(TITLE_MARKER) {
        return None;
    }
    line.split_once(':').map(|(_, title)| title.trim())
}

/// Splits a byte stream into UTF-8 lines.
///
/// A line ends at `\n`, at `\r\n` or at a lone `\r`. Only terminated lines are emitted by
/// [`push`](Self::push); an unterminated tail, including a multi-byte character cut in half
/// by a chunk boundary, stays buffered until more bytes arrive or [`finish`](Self::finish)
/// flushes it. A `\r` that ends a chunk is held back until the next byte shows whether a
/// `\n` follows it.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    // leading bytes of `buf` already known to hold no line terminator
    scanned: usize,
}

impl LineDecoder {
    /// creates an empty decoder
    pub fn new() -> Self {
        LineDecoder::default()
    }

    /// adds `chunk` to the buffer and returns every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut i = self.scanned;
        while i < self.buf.len() {
            match self.buf[i] {
                b'\n' => {
                    lines.push(decode(&self.buf[line_start..i]));
                    line_start = i + 1;
                }
                b'\r' => match self.buf.get(i + 1) {
                    None => break,
                    Some(&next) => {
                        lines.push(decode(&self.buf[line_start..i]));
                        if next == b'\n' {
                            i += 1;
                        }
                        line_start = i + 1;
                    }
                },
                _ => {}
            }
            i += 1;
        }

        self.buf.drain(..line_start);
        self.scanned = i - line_start;
        lines
    }

    /// returns the buffered, unterminated tail, if there is one
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let tail = self.buf.strip_suffix(b"\r").unwrap_or(&self.buf[..]);
        Some(decode(tail))
    }

    /// number of buffered bytes that do not form a complete line yet
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

// only called on bytes before a terminator or at end of stream. Terminator bytes never
// occur inside a multi-byte character, so no later chunk can complete one that fails here
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!("replacing invalid UTF-8 after byte {}", e.valid_up_to());
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Ingests the stream of a single book.
#[derive(Debug)]
pub struct IngestionHandler<D> {
    book: BookId,
    store: SharedStore,
    queue: AnalysisQueue,
    drain: D,
    title_seen: bool,
    lines: usize,
}

impl<D: BookDrain> IngestionHandler<D> {
    /// creates a handler that files everything it reads under `book`
    pub fn new(book: BookId, store: SharedStore, queue: AnalysisQueue, drain: D) -> Self {
        IngestionHandler {
            book,
            store,
            queue,
            drain,
            title_seen: false,
            lines: 0,
        }
    }

    /// the book this handler ingests
    pub fn book(&self) -> BookId {
        self.book
    }

    /// files one line: registers the first title, appends the line and queues the book
    fn dispatch(&mut self, line: String) {
        if !self.title_seen {
            if let Some(title) = parse_title(&line) {
                debug!("{} is titled {:?}", self.book, title);
                self.store.set_title(self.book, title);
                self.title_seen = true;
            }
        }
        self.store.append(line, self.book);
        self.queue.push(self.book);
        self.lines += 1;
    }

    // reads until end of stream, dispatching every complete line
    fn receive<R: Read>(&mut self, reader: &mut R, decoder: &mut LineDecoder) -> io::Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for line in decoder.push(&chunk[..n]) {
                self.dispatch(line);
            }
        }
    }

    /// reads `reader` to its end, then drains the book. A read error ends the stream early
    /// but the lines received so far are still kept and drained.
    ///
    /// Returns the number of lines ingested.
    pub fn run<R: Read>(mut self, mut reader: R) -> usize {
        let mut decoder = LineDecoder::new();
        if let Err(e) = self.receive(&mut reader, &mut decoder) {
            error!("error reading {}: {}", self.book, e);
        }
        if let Some(tail) = decoder.finish() {
            self.dispatch(tail);
        }

        // no more appends to this book from here on
        let snapshot = self.store.book_lines(self.book);
        if let Err(e) = self.drain.drain(self.book, &snapshot) {
            error!("could not drain {}: {}", self.book, e);
        }
        info!("{} closed after {} lines", self.book, self.lines);
        self.lines
    }
}
