// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounce scheduling for raw notifications.
//!
//! A burst of notifications arms a single one-shot deadline. Notifications that
//! arrive while the deadline is pending are covered by it: the deadline is never
//! pushed back.

use std::time::{Duration, Instant};

/// Default quiet interval between the first notification and the re-check.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// One-shot debounce timer driven by an explicit clock.
///
/// # Examples
///
/// ```rust
/// use deskcfg::engine::DebounceScheduler;
/// use std::time::{Duration, Instant};
///
/// let mut debounce = DebounceScheduler::new(Duration::from_millis(100));
/// let start = Instant::now();
///
/// assert!(debounce.arm(start));
/// assert!(!debounce.arm(start + Duration::from_millis(50)));
/// assert!(!debounce.fire_if_due(start + Duration::from_millis(99)));
/// assert!(debounce.fire_if_due(start + Duration::from_millis(100)));
/// assert!(!debounce.is_pending());
/// ```
#[derive(Clone, Debug)]
pub struct DebounceScheduler {
    interval: Duration,
    deadline: Option<Instant>,
}

impl DebounceScheduler {
    /// Creates an idle scheduler with the given quiet interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Returns the quiet interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the timer unless it is already pending.
    ///
    /// Returns `true` if this call started it.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.interval);
        true
    }

    /// Returns `true` if a deadline is pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns the pending deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns how long until the pending deadline, zero if it has passed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Consumes the deadline if it has passed. Returns `true` when the caller
    /// should run its re-check now.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drops any pending deadline.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
