use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Shutdown as NetShutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::analysis::AnalysisPool;
use crate::config::{Pattern, ServerConfig};
use crate::drain::BookDrain;
use crate::error::{BookscanError, Result};
use crate::ingest::IngestionHandler;
use crate::queue::AnalysisQueue;
use crate::report::Reporter;
use crate::shutdown::Shutdown;
use crate::store::{BookId, SharedStore};
use crate::thread_pool::ThreadPool;

/// A TCP server that ingests one book per connection and periodically reports how often the
/// configured pattern occurs in every book.
///
/// Each accepted connection is assigned the next [`BookId`] and is read by an
/// [`IngestionHandler`] running on the thread pool `P`. A fixed number of analysis workers is
/// started when the server runs; they recount books as lines arrive and print the ranking to
/// `W` once per interval. Finished books are handed to the drain `D`.
///
/// # Example
/// Create a server on an OS assigned port, counting "whale", that runs every connection on its
/// own thread and writes finished books into the current directory
/// ```rust
/// use bookscan::{BookServer, FileDrain, NaiveThreadPool, Pattern, ServerConfig, ThreadPool};
/// # fn main() -> bookscan::Result<()> {
/// let config = ServerConfig::new("127.0.0.1:0", Pattern::new("whale")?);
/// let pool = NaiveThreadPool::new(0)?;
/// let server = BookServer::bind(&config, pool, FileDrain::new("."), std::io::stdout())?;
/// let shutdown = server.shutdown_handle();
/// // server.run()?;
/// # shutdown.trigger();
/// # Ok(())
/// # }
/// ```
pub struct BookServer<P: ThreadPool, D: BookDrain, W> {
    listener: TcpListener,
    local_addr: SocketAddr,
    pattern: Pattern,
    workers: usize,
    store: SharedStore,
    queue: AnalysisQueue,
    reporter: Arc<Reporter<W>>,
    shutdown: Shutdown,
    /// runs one ingestion handler per connection
    pool: P,
    drain: D,
    // last book id handed out
    last_id: AtomicU64,
}

impl<P, D, W> BookServer<P, D, W>
where
    P: ThreadPool,
    D: BookDrain,
    W: Write + Send + 'static,
{
    /// binds the listening socket described by `config`.
    ///
    /// # Errors
    /// returns [`BookscanError::Bind`] if the address cannot be listened on
    pub fn bind(config: &ServerConfig, pool: P, drain: D, out: W) -> Result<Self> {
        let listener = TcpListener::bind(config.addr.as_str()).map_err(|source| {
            BookscanError::Bind {
                addr: config.addr.clone(),
                source,
            }
        })?;
        let local_addr = listener.local_addr()?;

        Ok(BookServer {
            listener,
            local_addr,
            pattern: config.pattern.clone(),
            workers: config.workers,
            store: SharedStore::new(),
            queue: AnalysisQueue::new(),
            reporter: Arc::new(Reporter::new(config.interval, out)),
            shutdown: Shutdown::new(),
            pool,
            drain,
            last_id: AtomicU64::new(0),
        })
    }

    /// the address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// a handle to the store every connection appends to
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// a handle that stops [`run`](Self::run) from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
            addr: self.local_addr,
        }
    }

    /// hands out the next book id, starting at 1
    fn next_book(&self) -> BookId {
        BookId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// starts the analysis workers and accepts connections until shutdown is triggered.
    /// Each connection is serviced on a thread from the ThreadPool.
    ///
    /// In-flight connections are not interrupted. The analysis workers are joined before
    /// this returns.
    pub fn run(self) -> Result<()> {
        let workers = AnalysisPool::spawn(
            self.workers,
            self.store.clone(),
            self.queue.clone(),
            self.pattern.clone(),
            Arc::clone(&self.reporter),
            self.shutdown.clone(),
        )?;
        info!("Listening on {}", self.local_addr);

        for stream in self.listener.incoming() {
            if !self.shutdown.is_running() {
                break;
            }
            match stream {
                Ok(stream) => {
                    let book = self.next_book();
                    match stream.peer_addr() {
                        Ok(peer) => info!("Accepted connection from {}, assigned {}", peer, book),
                        Err(_) => info!("Accepted connection, assigned {}", book),
                    }
                    let handler = IngestionHandler::new(
                        book,
                        self.store.clone(),
                        self.queue.clone(),
                        self.drain.clone(),
                    );
                    self.pool.spawn(move || serve(handler, stream));
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }

        info!("Shutting down server...");
        workers.shutdown();
        Ok(())
    }
}

/// reads one book from the `tcp` stream until the client closes it, then releases the socket
#[instrument(skip(handler, tcp), fields(book = %handler.book()))]
fn serve<D: BookDrain>(handler: IngestionHandler<D>, tcp: TcpStream) {
    let lines = handler.run(&tcp);
    debug!("ingested {} lines", lines);
    // the peer may already be gone
    let _ = tcp.shutdown(NetShutdown::Both);
}

/// Stops a running [`BookServer`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown: Shutdown,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// clears the running flag and wakes the accept loop so it can observe it
    pub fn trigger(&self) {
        self.shutdown.trigger();
        let mut addr = self.addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        // the server may already have stopped listening
        if let Err(e) = TcpStream::connect_timeout(&addr, Duration::from_secs(1)) {
            debug!("could not wake the accept loop: {}", e);
        }
    }

    /// returns `true` until [`trigger`](Self::trigger) is called
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }
}
