//! Server configuration: the listen address, the search [`Pattern`] and the tunables of the
//! analysis pipeline.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BookscanError, Result};

/// minimum time between two frequency reports
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// number of analysis workers started with the server
pub const DEFAULT_WORKERS: usize = 4;

/// number of threads used by the `shared` and `rayon` connection pools
pub const DEFAULT_POOL_THREADS: u32 = 16;

/// The substring whose occurrences are counted in every book. It is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern(String);

impl Pattern {
    /// creates a new pattern
    ///
    /// # Errors
    /// returns [`BookscanError::EmptyPattern`] if `pattern` is the empty string
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(BookscanError::EmptyPattern);
        }
        Ok(Pattern(pattern))
    }

    /// the pattern text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// counts the non-overlapping occurrences of this pattern in `text`
    pub fn count_in(&self, text: &str) -> usize {
        text.matches(self.0.as_str()).count()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of [`ThreadPool`](crate::ThreadPool) that runs connection handlers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PoolKind {
    /// one new thread per connection
    Naive,
    /// a fixed number of threads fed from a shared queue
    Shared,
    /// a rayon work-stealing pool
    Rayon,
}

impl FromStr for PoolKind {
    type Err = BookscanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(PoolKind::Naive),
            "shared" => Ok(PoolKind::Shared),
            "rayon" => Ok(PoolKind::Rayon),
            other => Err(BookscanError::Parsing(format!(
                "unknown pool kind: {}, expected one of naive, shared, rayon",
                other
            ))),
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::Naive => "naive",
            PoolKind::Shared => "shared",
            PoolKind::Rayon => "rayon",
        };
        f.write_str(name)
    }
}

/// ['ServerConfig'] holds everything a [`BookServer`](crate::BookServer) needs to start
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// the address to listen on, e.g. "127.0.0.1:4000"
    pub addr: String,
    /// the pattern to count
    pub pattern: Pattern,
    /// minimum time between reports, also the bounded wait of a worker dequeue
    pub interval: Duration,
    /// number of analysis workers
    pub workers: usize,
    /// directory that finished books are written into
    pub output_dir: PathBuf,
    /// thread pool used for connection handlers
    pub pool: PoolKind,
    /// thread count for the `shared` and `rayon` pools
    pub pool_threads: u32,
}

impl ServerConfig {
    /// creates a config for `addr` and `pattern` with every other field at its default
    pub fn new(addr: impl Into<String>, pattern: Pattern) -> Self {
        ServerConfig {
            addr: addr.into(),
            pattern,
            interval: DEFAULT_INTERVAL,
            workers: DEFAULT_WORKERS,
            output_dir: PathBuf::from("."),
            pool: PoolKind::Naive,
            pool_threads: DEFAULT_POOL_THREADS,
        }
    }
}

/// turns the `--listen` value into a socket address string.
/// A bare port number listens on localhost, anything else is used as given.
pub fn listen_addr(listen: &str) -> Result<String> {
    if let Ok(port) = listen.parse::<u16>() {
        return Ok(format!("127.0.0.1:{}", port));
    }
    listen
        .parse::<std::net::SocketAddr>()
        .map(|addr| addr.to_string())
        .map_err(|_| {
            BookscanError::Parsing(format!(
                "could not parse {} into a port or an IP address and port",
                listen
            ))
        })
}
