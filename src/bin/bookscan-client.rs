//! this binary streams one book to a bookscan server
//! to see the list of options, type: `bookscan-client --help`

use std::fs::File;
use std::io::{self, BufReader};
use std::process::exit;
use std::time::Duration;

use bookscan::{BookClient, BookscanError, Result};
use clap::{crate_version, value_t, App, Arg};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_ADDRESS: &str = "127.0.0.1:4000";

fn main() {
    let matches = App::new("bookscan-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("Network client to send lines of a book.")
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("the server's IP_ADDR:PORT")
            .default_value(DEFAULT_ADDRESS))
        .arg(Arg::with_name("file")
            .long("file")
            .short("f")
            .value_name("PATH")
            .help("the book to send, reads STDIN if omitted"))
        .arg(Arg::with_name("delay-ms")
            .long("delay-ms")
            .value_name("MS")
            .help("milliseconds to wait after each line")
            .default_value("0"))
        .get_matches();

    subscriber_config();

    let addr = matches.value_of("addr").unwrap_or(DEFAULT_ADDRESS);
    let delay = match value_t!(matches, "delay-ms", u64) {
        Ok(ms) => Duration::from_millis(ms),
        Err(e) => {
            eprintln!("{}", BookscanError::Parsing(e.message));
            exit(1);
        }
    };

    if let Err(e) = run(addr, matches.value_of("file"), delay) {
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(addr: &str, file: Option<&str>, delay: Duration) -> Result<()> {
    let mut client = BookClient::connect(addr)?.with_delay(delay);
    let sent = match file {
        Some(path) => client.send_lines(BufReader::new(File::open(path)?))?,
        None => client.send_lines(io::stdin().lock())?,
    };
    client.finish()?;
    info!("sent {} lines to {}", sent, addr);
    Ok(())
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
