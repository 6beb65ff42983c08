//! progress estimation for long-running queries

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// estimated totals at or above this are reported while they run
pub const LARGE_QUERY_THRESHOLD: u64 = 50_000;

const WINDOW: usize = 10;

/// moving average of observed throughput over the last few rounds
#[derive(Debug, Clone)]
pub(crate) struct ProgressTracker {
    estimated_total: Option<u64>,
    window: VecDeque<(u64, Duration)>,
    interval: Duration,
    last_report: Option<Instant>,
}

impl ProgressTracker {
    pub(crate) fn new(estimated_total: Option<u64>, interval: Duration) -> Self {
        Self {
            estimated_total,
            window: VecDeque::with_capacity(WINDOW),
            interval,
            last_report: None,
        }
    }

    pub(crate) fn estimated_total(&self) -> Option<u64> {
        self.estimated_total
    }

    pub(crate) fn record(&mut self, retrieved: u64, elapsed: Duration) {
        if self.window.len() == WINDOW {
            self.window.pop_front();
        }
        self.window.push_back((retrieved, elapsed));
    }

    /// instances per second over the window
    pub(crate) fn throughput(&self) -> Option<f64> {
        let (count, elapsed) = self
            .window
            .iter()
            .fold((0u64, Duration::ZERO), |(count, elapsed), (c, e)| {
                (count + c, elapsed + *e)
            });
        let seconds = elapsed.as_secs_f64();
        if count == 0 || seconds <= 0.0 {
            return None;
        }
        Some(count as f64 / seconds)
    }

    pub(crate) fn remaining(&self, retrieved: u64) -> Option<Duration> {
        let total = self.estimated_total?;
        let throughput = self.throughput()?;
        let left = total.saturating_sub(retrieved);
        Some(Duration::from_secs_f64(left as f64 / throughput))
    }

    /// true when a progress line is due; marks it as reported
    pub(crate) fn should_report(&mut self, now: Instant) -> bool {
        if self.estimated_total.unwrap_or(0) < LARGE_QUERY_THRESHOLD {
            return false;
        }
        let due = self
            .last_report
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last_report = Some(now);
        }
        due
    }
}
