use std::io;
use thiserror::Error;

/// type alias for all operations in this crate that could fail with a [`BookscanError`]
pub type Result<T> = std::result::Result<T, BookscanError>;

/// The Error variants used by the bookscan server, client and their collaborators.
#[derive(Error, Debug)]
pub enum BookscanError {
    /// variant for errors caused from network or file IO
    #[error(transparent)]
    Io(#[from] io::Error),

    /// the listening socket could not be bound, the server cannot start
    #[error("could not listen on {addr}: {source}")]
    Bind {
        /// the address that was requested
        addr: String,
        /// the underlying socket error
        source: io::Error,
    },

    /// a search pattern must contain at least one character
    #[error("the search pattern must not be empty")]
    EmptyPattern,

    /// a command line value could not be parsed
    #[error("{0}")]
    Parsing(String),

    /// a thread pool could not be built
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}
