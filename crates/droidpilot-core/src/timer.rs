//! Debounced poll timer.
//!
//! Polling loops that act on the first instant a condition flips tend to
//! flap on noisy screens. [`Timer`] requires both an elapsed limit and a
//! minimum number of confirming [`Timer::reached`] calls before reporting
//! "reached", so a boundary must hold across several poll iterations.
//!
//! Not synchronized; share across threads only with external locking.

use std::fmt;
use std::time::{Duration, Instant};

/// A reusable stopwatch with a confirmation count.
#[derive(Debug, Clone)]
pub struct Timer {
    limit: Duration,
    count: u32,
    start: Option<Instant>,
    confirms: u32,
}

impl Timer {
    /// Timer with no confirmation debounce (`count = 0`).
    pub fn new(limit: Duration) -> Self {
        Self::with_count(limit, 0)
    }

    /// Timer that additionally requires `count + 1` confirming
    /// `reached()` calls.
    pub fn with_count(limit: Duration, count: u32) -> Self {
        Self {
            limit,
            count,
            start: None,
            confirms: count,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Start the clock. No-op when already running.
    pub fn start(&mut self) -> &mut Self {
        if !self.started() {
            self.start = Some(Instant::now());
            self.confirms = 0;
        }
        self
    }

    pub fn started(&self) -> bool {
        self.start.is_some()
    }

    /// Elapsed time, zero when idle.
    pub fn current(&self) -> Duration {
        self.start.map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Time left until the limit, zero once elapsed or when idle.
    pub fn remain(&self) -> Duration {
        match self.start {
            Some(s) => self.limit.saturating_sub(s.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Check whether the timer has reached its limit.
    ///
    /// Every call increments the confirmation counter (deliberately not
    /// idempotent). Returns true only once the elapsed time exceeds the
    /// limit AND the counter exceeds `count`. An idle timer counts as
    /// elapsed, so after [`Timer::clear`] a single call reports reached.
    pub fn reached(&mut self) -> bool {
        self.confirms += 1;
        let elapsed = self.start.map_or(true, |s| s.elapsed() > self.limit);
        elapsed && self.confirms > self.count
    }

    /// Restart the clock and counter, staying in the running state.
    pub fn reset(&mut self) -> &mut Self {
        self.start = Some(Instant::now());
        self.confirms = 0;
        self
    }

    /// Back to "never started", with the counter pinned at `count` so the
    /// next `reached()` is satisfiable immediately.
    pub fn clear(&mut self) -> &mut Self {
        self.start = None;
        self.confirms = self.count;
        self
    }

    /// Returns true and resets when reached; otherwise false with no
    /// further state change beyond the confirmation increment.
    pub fn reached_and_reset(&mut self) -> bool {
        if self.reached() {
            self.reset();
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timer(limit={:.3}/{:.3}s, count={}/{})",
            self.current().as_secs_f64(),
            self.limit.as_secs_f64(),
            self.confirms,
            self.count
        )
    }
}
