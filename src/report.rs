//! Rate limited frequency reports.
//!
//! Whichever analysis worker first notices that a report is due takes the report gate,
//! checks again, and prints the ranking. Workers that lose the race skip the report for
//! this cycle.
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::store::{RankEntry, SharedStore};

/// printed above every non-empty ranking
pub const REPORT_HEADER: &str = "Sorted frequency:";

/// writes `ranking` as a header followed by one `<title>: <count>` line per book.
/// Nothing is written for an empty ranking. Returns `true` if anything was written.
pub fn write_ranking<W: Write>(out: &mut W, ranking: &[RankEntry]) -> io::Result<bool> {
    if ranking.is_empty() {
        return Ok(false);
    }
    writeln!(out, "{}", REPORT_HEADER)?;
    for entry in ranking {
        writeln!(out, "{}: {}", entry.display_title(), entry.count)?;
    }
    out.flush()?;
    Ok(true)
}

/// Prints the ranking of a [`SharedStore`] to `W` at most once per interval.
///
/// The time of the last report is kept in an atomic so the common "not due yet" check
/// needs no lock. The output itself sits behind the report gate.
#[derive(Debug)]
pub struct Reporter<W> {
    origin: Instant,
    interval: Duration,
    // nanoseconds between `origin` and the last report
    last: AtomicU64,
    gate: Mutex<W>,
}

impl<W: Write> Reporter<W> {
    /// creates a reporter whose first report is due one `interval` from now
    pub fn new(interval: Duration, out: W) -> Self {
        Reporter {
            origin: Instant::now(),
            interval,
            last: AtomicU64::new(0),
            gate: Mutex::new(out),
        }
    }

    /// the minimum time between two reports
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn offset(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_nanos() as u64
    }

    /// returns `true` if at least one interval passed between the last report and `now`
    pub fn is_due(&self, now: Instant) -> bool {
        let last = self.last.load(Ordering::Acquire);
        let elapsed = self.offset(now).saturating_sub(last);
        elapsed >= self.interval.as_nanos() as u64
    }

    /// reports the ranking of `store` if one is due
    pub fn report_if_due(&self, store: &SharedStore) -> io::Result<bool> {
        self.report_if_due_at(Instant::now(), store)
    }

    /// reports the ranking of `store` if one is due at `now`.
    ///
    /// Returns `true` if this call won the report for the current interval, even when the
    /// ranking was empty and nothing was printed.
    pub fn report_if_due_at(&self, now: Instant, store: &SharedStore) -> io::Result<bool> {
        if !self.is_due(now) {
            return Ok(false);
        }
        let mut out = self.gate.lock();
        // another worker may have reported while we waited on the gate
        if !self.is_due(now) {
            trace!("report already printed for this interval");
            return Ok(false);
        }
        self.last.store(self.offset(now), Ordering::Release);

        let ranking = store.ranking();
        write_ranking(&mut *out, &ranking)?;
        Ok(true)
    }
}
