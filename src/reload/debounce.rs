//! Last-compile-wins reload timer.
//!
//! At most one reload is pending at any instant. Every trigger replaces the
//! outstanding deadline, so a burst of compiles yields a single reload once
//! the burst has been quiet for the whole delay.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    deadline: Instant,
    scheduled_at: Instant,
}

/// The single pending reload timer.
#[derive(Debug, Default)]
pub struct PendingReload {
    slot: Option<Scheduled>,
}

impl PendingReload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a reload `delay` after `now`.
    ///
    /// Returns `true` if an earlier pending reload was cancelled.
    pub fn trigger(&mut self, now: Instant, delay: Duration) -> bool {
        self.slot
            .replace(Scheduled {
                deadline: now + delay,
                scheduled_at: now,
            })
            .is_some()
    }

    pub fn cancel(&mut self) -> bool {
        self.slot.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.map(|s| s.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Clear the timer if its deadline has passed.
    ///
    /// Returns when the fired reload was scheduled.
    pub fn take_due(&mut self, now: Instant) -> Option<Instant> {
        let scheduled = self.slot.filter(|s| s.deadline <= now)?;
        self.slot = None;
        Some(scheduled.scheduled_at)
    }
}
