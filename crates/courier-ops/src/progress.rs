//! Progress coalescing for workers.

use std::time::{Duration, Instant};

/// Decides when a worker should report progress.
///
/// A report is due once `batch` items have completed since the last one, or
/// once `interval` has passed, whichever comes first.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    batch: u64,
    interval: Duration,
    last_done: u64,
    last_emit: Instant,
}

impl ProgressThrottle {
    pub fn new(batch: u64, interval: Duration) -> Self {
        Self {
            batch: batch.max(1),
            interval,
            last_done: 0,
            last_emit: Instant::now(),
        }
    }

    /// Whether `done` should be reported now. Records the report if so.
    pub fn should_emit(&mut self, done: u64) -> bool {
        let due = done.saturating_sub(self.last_done) >= self.batch
            || self.last_emit.elapsed() >= self.interval;
        if due {
            self.last_done = done;
            self.last_emit = Instant::now();
        }
        due
    }
}
