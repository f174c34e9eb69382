//! Resize debouncing
//!
//! A single-slot delayed timer: every notification replaces the pending
//! request and pushes the deadline out, so a burst of resize events yields
//! one reallocation sized to the last event. Time is passed in explicitly;
//! the frame loop polls with `Instant::now()` each tick.

use std::time::{Duration, Instant};

/// Coalesces bursts of requests into the last one
#[derive(Debug, Clone)]
pub struct ResizeDebouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> ResizeDebouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Records `request` at `now`, replacing any pending one
    pub fn notify(&mut self, request: T, now: Instant) {
        self.pending = Some((request, now + self.delay));
    }

    /// Returns the pending request once `delay` has elapsed since the last
    /// notification; afterwards nothing is pending.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.pending.take().map(|(req, _)| req),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending request will fire, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
