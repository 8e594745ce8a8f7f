//! # Progress: Scan Counters and Periodic Status Line
//!
//! The scan is single-threaded, so counters are plain integers owned by the
//! driver. Instead of a background reporter thread, the driver calls
//! [`Progress::maybe_report`] once per iteration and a status line is logged
//! whenever the report interval has elapsed.

use std::time::{Duration, Instant};

use tracing::info;

use crate::Verdict;

pub const REPORT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Progress {
    pub probed: u64,
    pub taken: u64,
    pub available: u64,
    pub indeterminate: u64,
    pub skipped: u64,
    /// Size of the configured search space, when it fits in a `u128`.
    pub space: Option<u128>,
    start: Instant,
    last_report: Instant,
    interval: Duration,
}

impl Progress {
    pub fn new(space: Option<u128>) -> Self {
        Self::with_interval(space, REPORT_INTERVAL)
    }

    pub fn with_interval(space: Option<u128>, interval: Duration) -> Self {
        let now = Instant::now();
        Progress {
            probed: 0,
            taken: 0,
            available: 0,
            indeterminate: 0,
            skipped: 0,
            space,
            start: now,
            last_report: now,
            interval,
        }
    }

    pub fn record(&mut self, verdict: Verdict) {
        self.probed += 1;
        match verdict {
            Verdict::Taken => self.taken += 1,
            Verdict::Available => self.available += 1,
            Verdict::Indeterminate => self.indeterminate += 1,
        }
    }

    /// Log a status line if the report interval has passed. Returns whether
    /// a line was logged.
    pub fn maybe_report(&mut self, current: &str) -> bool {
        if self.last_report.elapsed() < self.interval {
            return false;
        }
        self.last_report = Instant::now();
        self.print_status(current);
        true
    }

    pub fn rate(&self) -> f64 {
        let elapsed = self.start.elapsed();
        if elapsed.as_secs() > 0 {
            self.probed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_status(&self, current: &str) {
        let elapsed = self.start.elapsed();
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        let covered = self.probed + self.skipped;
        info!(
            current = %current,
            probed = self.probed,
            skipped = self.skipped,
            taken = self.taken,
            available = self.available,
            indeterminate = self.indeterminate,
            space = ?self.space,
            covered,
            rate = format_args!("{:.2}", self.rate()),
            elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
            "scan progress"
        );
    }
}
