#![deny(missing_docs)]
//! A multithreaded server that ingests books streamed over TCP and keeps a live ranking of
//! how often a search pattern occurs in each of them.
//!
//! This crate provides the shared [`SharedStore`] and the analysis pipeline around it, as
//! well as a [`bookscan-server`] and [`bookscan-client`] executable.
//!
//! ## Pipeline
//! - every accepted connection is one book. Its [`IngestionHandler`] decodes the byte stream
//!   into lines, registers the book's title from a `Title: ...` line, appends every line to
//!   the store and pushes the book id onto the [`AnalysisQueue`]
//! - a fixed pool of analysis workers pops book ids, recounts the pattern in that book and
//!   updates the frequency map. A book whose count drops to zero leaves the ranking
//! - once per interval (5 seconds by default) exactly one worker wins the [`Reporter`] gate
//!   and prints the ranking, most frequent first:
//!
//! ```text
//! Sorted frequency:
//! Moby Dick: 1228
//! Unknown Book: 3
//! ```
//!
//! - when a connection closes, the book's lines are written to `book_NN.txt` by the
//!   [`FileDrain`]
//!
//! ## Record Store
//! [`RecordStore`] is append-only. Records sit in an arena in global arrival order and every
//! book keeps the indices of its own records, so each record is reachable from exactly one
//! book. All store operations go through one lock in [`SharedStore`].
//!
//! Occurrences are counted per line; a pattern that spans two lines is never counted.
//!
//! [`bookscan-server`]: ./bin/bookscan-server.rs
//! [`bookscan-client`]: ./bin/bookscan-client.rs

pub use analysis::{AnalysisPool, AnalysisWorker};
pub use client::BookClient;
pub use config::{
    listen_addr, Pattern, PoolKind, ServerConfig, DEFAULT_INTERVAL, DEFAULT_POOL_THREADS,
    DEFAULT_WORKERS,
};
pub use drain::{BookDrain, FileDrain};
pub use error::{BookscanError, Result};
pub use ingest::{parse_title, IngestionHandler, LineDecoder, TITLE_MARKER};
pub use queue::AnalysisQueue;
pub use report::{write_ranking, Reporter, REPORT_HEADER};
pub use server::{BookServer, ShutdownHandle};
pub use shutdown::Shutdown;
pub use store::{BookId, RankEntry, Record, RecordId, RecordStore, SharedStore, UNKNOWN_TITLE};
pub use thread_pool::{NaiveThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};

mod analysis;
mod client;
mod config;
mod drain;
mod error;
mod ingest;
mod queue;
mod report;
mod server;
mod shutdown;
mod store;
pub mod thread_pool;
