//! this binary starts the bookscan server
//! to see the list of options, type: `bookscan-server --help`
//!
//! typing `quit` on STDIN stops the server

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::exit;
use std::thread;
use std::time::Duration;

use bookscan::{
    listen_addr, BookServer, BookscanError, FileDrain, NaiveThreadPool, Pattern, PoolKind,
    RayonThreadPool, Result, ServerConfig, SharedQueueThreadPool, ShutdownHandle, ThreadPool,
    DEFAULT_POOL_THREADS, DEFAULT_WORKERS,
};
use clap::{crate_version, value_t, App, Arg, ArgMatches};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_LISTEN: &str = "4000";
const DEFAULT_INTERVAL_SECS: &str = "5";
const DEFAULT_LOG_LEVEL: &str = "info";
// the line on STDIN that stops the server
const QUIT_COMMAND: &str = "quit";

/// validates the parsed command line arguments and turns them into a [`ServerConfig`]
/// # Errors
/// returns [`BookscanError::Parsing`] or [`BookscanError::EmptyPattern`] if one of the
/// parameters is invalid
///
fn build_config(matches: &ArgMatches) -> Result<ServerConfig> {
    let addr = listen_addr(matches.value_of("listen").unwrap_or(DEFAULT_LISTEN))?;
    let pattern = Pattern::new(matches.value_of("pattern").unwrap_or_default())?;

    let mut config = ServerConfig::new(addr, pattern);
    config.interval = Duration::from_secs(
        value_t!(matches, "interval", u64).map_err(|e| BookscanError::Parsing(e.message))?,
    );
    config.workers =
        value_t!(matches, "workers", usize).map_err(|e| BookscanError::Parsing(e.message))?;
    if config.workers == 0 {
        return Err(BookscanError::Parsing("at least one analysis worker is required".into()));
    }
    config.pool_threads =
        value_t!(matches, "pool-threads", u32).map_err(|e| BookscanError::Parsing(e.message))?;
    config.pool = matches.value_of("pool").unwrap_or("naive").parse()?;
    if let Some(dir) = matches.value_of("output-dir") {
        config.output_dir = PathBuf::from(dir);
    }
    Ok(config)
}

fn main() {
    let workers = DEFAULT_WORKERS.to_string();
    let pool_threads = DEFAULT_POOL_THREADS.to_string();

    // parse command line args
    let matches = App::new("bookscan-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("ranks books streamed over TCP by how often they contain a pattern")
        .arg(Arg::with_name("listen")
            .short("l")
            .long("listen")
            .value_name("PORT|IP_ADDR:PORT")
            .help("sets the port (on localhost) or IP_ADDR:PORT that the server listens on")
            .default_value(DEFAULT_LISTEN))
        .arg(Arg::with_name("pattern")
            .short("p")
            .long("pattern")
            .value_name("PATTERN")
            .help("the search pattern to count in every book")
            .required(true))
        .arg(Arg::with_name("interval")
            .long("interval")
            .value_name("SECS")
            .help("seconds between two frequency reports")
            .default_value(DEFAULT_INTERVAL_SECS))
        .arg(Arg::with_name("workers")
            .long("workers")
            .value_name("N")
            .help("number of analysis workers")
            .default_value(&workers))
        .arg(Arg::with_name("output-dir")
            .long("output-dir")
            .value_name("DIR")
            .help("directory that finished books are written to, defaults to the current directory"))
        .arg(Arg::with_name("pool")
            .long("pool")
            .value_name("POOL")
            .help("thread pool running the connections; shared and rayon read at most --pool-threads books at once, later connections wait")
            .possible_values(&["naive", "shared", "rayon"])
            .default_value("naive"))
        .arg(Arg::with_name("pool-threads")
            .long("pool-threads")
            .value_name("N")
            .help("threads in the shared and rayon pools")
            .default_value(&pool_threads))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("one of trace, debug, info, warn, error")
            .default_value(DEFAULT_LOG_LEVEL))
        .get_matches();

    let level = value_t!(matches, "log-level", Level).unwrap_or(Level::INFO);
    // set up a tracing subscriber to log to STDERR
    subscriber_config(level);

    let config = match build_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // start the server
    if let Err(e) = run(config) {
        eprintln!("{}", e);
        exit(1);
    }
    info!("Server terminated.");
}

fn run(config: ServerConfig) -> Result<()> {
    info!("bookscan-server {}", env!("CARGO_PKG_VERSION"));
    info!("Search pattern: {:?}", config.pattern.as_str());
    info!("Connection pool: {}", config.pool);

    match config.pool {
        PoolKind::Naive => run_with_pool(NaiveThreadPool::new(config.pool_threads)?, config),
        PoolKind::Shared => run_with_pool(SharedQueueThreadPool::new(config.pool_threads)?, config),
        PoolKind::Rayon => run_with_pool(RayonThreadPool::new(config.pool_threads)?, config),
    }
}

fn run_with_pool<P: ThreadPool>(pool: P, config: ServerConfig) -> Result<()> {
    let drain = FileDrain::new(&config.output_dir);
    let server = BookServer::bind(&config, pool, drain, io::stdout())?;
    let handle = server.shutdown_handle();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || watch_stdin(handle))?;
    server.run()
}

/// triggers shutdown once a `quit` line is read from STDIN
fn watch_stdin(handle: ShutdownHandle) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) if line.trim() == QUIT_COMMAND => {
                handle.trigger();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("could not read STDIN: {}", e);
                return;
            }
        }
    }
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) {
    let subscriber = FmtSubscriber::builder()
        // all spans/events at `level` or more severe are written
        .with_max_level(level)
        // log to stderr so the frequency reports on stdout stay readable
        .with_writer(io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
