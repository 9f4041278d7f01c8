use std::io::{BufRead, BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::Result;

/// `BookClient` streams the lines of one book to a [`BookServer`](crate::BookServer).
/// Every client connection becomes a separate book on the server.
#[derive(Debug)]
pub struct BookClient {
    writer: BufWriter<TcpStream>,
    delay: Option<Duration>,
}

impl BookClient {
    /// creates a client and establishes a socket connection to the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let tcp = TcpStream::connect(addr)?;
        Ok(BookClient {
            writer: BufWriter::new(tcp),
            delay: None,
        })
    }

    /// waits `delay` after every line sent, to simulate a slow upload
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay).filter(|d| !d.is_zero());
        self
    }

    /// sends one line, appending the line terminator
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        if let Some(delay) = self.delay {
            self.writer.flush()?;
            thread::sleep(delay);
        }
        Ok(())
    }

    /// sends every line of `reader`
    ///
    /// # Returns
    /// the number of lines sent
    pub fn send_lines<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut sent = 0;
        for line in reader.lines() {
            self.send_line(&line?)?;
            sent += 1;
        }
        self.writer.flush()?;
        debug!("sent {} lines", sent);
        Ok(sent)
    }

    /// flushes and half-closes the connection so the server sees the end of the book
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().shutdown(Shutdown::Write)?;
        Ok(())
    }
}
