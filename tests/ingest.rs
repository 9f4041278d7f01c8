use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bookscan::{
    parse_title, AnalysisQueue, BookDrain, BookId, FileDrain, IngestionHandler, LineDecoder,
    SharedStore,
};
use tempfile::TempDir;

/// a reader that hands out pre-cut chunks, optionally failing after the last one
struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
    fail_at_end: bool,
}

impl ChunkedReader {
    fn new(chunks: &[&str]) -> Self {
        ChunkedReader {
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            fail_at_end: false,
        }
    }

    fn failing(mut self) -> Self {
        self.fail_at_end = true;
        self
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None if self.fail_at_end => {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
            }
            None => Ok(0),
        }
    }
}

/// remembers every drained book
#[derive(Clone, Default)]
struct RecordingDrain {
    drained: Arc<Mutex<Vec<(BookId, Vec<String>)>>>,
}

impl BookDrain for RecordingDrain {
    fn drain(&self, book: BookId, lines: &[String]) -> bookscan::Result<()> {
        self.drained.lock().unwrap().push((book, lines.to_vec()));
        Ok(())
    }
}

fn drain_queue(queue: &AnalysisQueue) -> Vec<BookId> {
    let mut ids = Vec::new();
    while let Some(id) = queue.pop_timeout(Duration::from_millis(1)) {
        ids.push(id);
    }
    ids
}

#[test]
fn decoder_emits_only_terminated_lines() {
    let mut decoder = LineDecoder::new();
    assert!(decoder.push(b"first li").is_empty());
    assert_eq!(decoder.push(b"ne\nsecond\r\nthi"), vec!["first line", "second"]);
    assert_eq!(decoder.pending(), 3);
    assert_eq!(decoder.finish(), Some("thi".to_string()));
}

#[test]
fn decoder_keeps_empty_lines() {
    let mut decoder = LineDecoder::new();
    assert_eq!(decoder.push(b"a\n\nb\n"), vec!["a", "", "b"]);
    assert_eq!(decoder.finish(), None);
}

#[test]
fn decoder_waits_for_split_multibyte_character() {
    let word = "naïve\n".as_bytes();
    // split inside the two byte 'ï'
    let (head, tail) = word.split_at(3);
    let mut decoder = LineDecoder::new();
    assert!(decoder.push(head).is_empty());
    assert_eq!(decoder.push(tail), vec!["naïve"]);
}

#[test]
fn decoder_replaces_invalid_bytes() {
    let mut decoder = LineDecoder::new();
    let lines = decoder.push(b"ok \xff here\n");
    assert_eq!(lines, vec!["ok \u{fffd} here"]);
}

#[test]
fn decoder_ends_lines_at_lone_carriage_returns() {
    let mut decoder = LineDecoder::new();
    assert_eq!(
        decoder.push(b"Title: Old Mac\rthe whale\rwhale\r"),
        vec!["Title: Old Mac", "the whale"]
    );
    // the last '\r' may still be the first half of "\r\n"
    assert_eq!(decoder.pending(), 6);
    assert_eq!(decoder.finish(), Some("whale".to_string()));
}

#[test]
fn decoder_joins_crlf_split_across_chunks() {
    let mut decoder = LineDecoder::new();
    assert!(decoder.push(b"a\r").is_empty());
    assert_eq!(decoder.push(b"\nb\r"), vec!["a"]);
    assert_eq!(decoder.push(b"c\r\r\n"), vec!["b", "c", ""]);
    assert_eq!(decoder.finish(), None);
}

#[test]
fn decoder_handles_long_unterminated_runs() {
    const CHUNKS: usize = 10_000;
    let chunk = [b'x'; 1024];
    let mut decoder = LineDecoder::new();

    let started = Instant::now();
    for _ in 0..CHUNKS {
        assert!(decoder.push(&chunk).is_empty());
    }
    let lines = decoder.push(b"\n");
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].len(), CHUNKS * chunk.len());
    assert_eq!(decoder.pending(), 0);
}

#[test]
fn title_lines_are_recognized() {
    assert_eq!(parse_title("Title: Moby Dick"), Some("Moby Dick"));
    assert_eq!(parse_title("Title:Emma: A Novel  "), Some("Emma: A Novel"));
    assert_eq!(parse_title("Title without colon"), None);
    assert_eq!(parse_title("The Title: no"), None);
}

#[test]
fn handler_appends_every_line_and_queues_the_book() {
    let store = SharedStore::new();
    let queue = AnalysisQueue::new();
    let drain = RecordingDrain::default();
    let handler = IngestionHandler::new(BookId(1), store.clone(), queue.clone(), drain.clone());

    let reader = ChunkedReader::new(&["Title: Moby ", "Dick\nCall me Ish", "mael.\nthe end"]);
    assert_eq!(handler.run(reader), 3);

    let expected = vec!["Title: Moby Dick", "Call me Ishmael.", "the end"];
    assert_eq!(store.book_lines(BookId(1)), expected);
    assert_eq!(store.title(BookId(1)), Some("Moby Dick".to_string()));
    assert_eq!(drain_queue(&queue), vec![BookId(1); 3]);

    let drained = drain.drained.lock().unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].0, BookId(1));
    assert_eq!(drained[0].1, expected);
}

#[test]
fn handler_splits_carriage_return_only_books() {
    let store = SharedStore::new();
    let queue = AnalysisQueue::new();
    let drain = RecordingDrain::default();
    let handler = IngestionHandler::new(BookId(6), store.clone(), queue.clone(), drain.clone());

    let reader = ChunkedReader::new(&["Title: Old Mac\rthe wh", "ale\rwhale\r"]);
    assert_eq!(handler.run(reader), 3);

    let expected = vec!["Title: Old Mac", "the whale", "whale"];
    assert_eq!(store.book_lines(BookId(6)), expected);
    assert_eq!(store.title(BookId(6)), Some("Old Mac".to_string()));
    assert_eq!(drain_queue(&queue), vec![BookId(6); 3]);
    assert_eq!(drain.drained.lock().unwrap()[0].1, expected);
}

#[test]
fn handler_keeps_the_first_title() {
    let store = SharedStore::new();
    let handler =
        IngestionHandler::new(BookId(4), store.clone(), AnalysisQueue::new(), RecordingDrain::default());
    handler.run(ChunkedReader::new(&["Title: One\nTitle: Two\n"]));
    assert_eq!(store.title(BookId(4)), Some("One".to_string()));
    assert_eq!(store.book_lines(BookId(4)).len(), 2);
}

#[test]
fn read_error_ends_only_this_book_and_still_drains() {
    let store = SharedStore::new();
    let drain = RecordingDrain::default();
    let handler =
        IngestionHandler::new(BookId(2), store.clone(), AnalysisQueue::new(), drain.clone());

    let reader = ChunkedReader::new(&["one\ntw"]).failing();
    assert_eq!(handler.run(reader), 2);
    assert_eq!(store.book_lines(BookId(2)), vec!["one", "tw"]);
    assert_eq!(drain.drained.lock().unwrap().len(), 1);
}

#[test]
fn empty_stream_drains_an_empty_book() {
    let drain = RecordingDrain::default();
    let handler =
        IngestionHandler::new(BookId(3), SharedStore::new(), AnalysisQueue::new(), drain.clone());
    assert_eq!(handler.run(io::empty()), 0);
    let drained = drain.drained.lock().unwrap();
    assert_eq!(drained[0], (BookId(3), Vec::new()));
}

#[test]
fn file_drain_writes_zero_padded_book_files() {
    let dir = TempDir::new().expect("unable to create temporary working directory");
    let drain = FileDrain::new(dir.path().join("books"));
    let lines = vec!["Title: Emma".to_string(), "".to_string(), "fin".to_string()];

    drain.drain(BookId(7), &lines).unwrap();

    let path = dir.path().join("books").join("book_07.txt");
    assert_eq!(drain.path_for(BookId(7)), path);
    assert_eq!(std::fs::read_to_string(path).unwrap(), "Title: Emma\n\nfin\n");
}

#[test]
fn file_drain_does_not_truncate_wide_ids() {
    let dir = TempDir::new().expect("unable to create temporary working directory");
    let drain = FileDrain::new(dir.path());
    drain.drain(BookId(123), &["x".to_string()]).unwrap();
    assert!(dir.path().join("book_123.txt").exists());
}
