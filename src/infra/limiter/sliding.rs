//! Sliding-window rate limiter.
//!
//! Same contract as [`WindowLimiter`](super::WindowLimiter) but without the
//! boundary burst: every released job keeps counting against the budget for
//! exactly one window after it finished, so no window-length interval ever
//! admits more than `max` jobs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::window::MIN_WINDOW;
use crate::core::Limiter;

#[derive(Debug, Default)]
struct SlidingState {
    in_flight: usize,
    /// Release instants still inside the window, oldest first.
    released: VecDeque<Instant>,
}

impl SlidingState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while self
            .released
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= window)
        {
            self.released.pop_front();
        }
    }
}

/// Admits at most `max` jobs per rolling window.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max: usize,
    window: Duration,
    state: Mutex<SlidingState>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `max` jobs per rolling `window`.
    ///
    /// Windows shorter than [`MIN_WINDOW`] (including zero) are raised to it.
    #[must_use]
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window: window.max(MIN_WINDOW),
            state: Mutex::new(SlidingState::default()),
        }
    }

    /// Configured per-window ceiling.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Jobs admitted and not yet released.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Jobs that count against the budget right now.
    #[must_use]
    pub fn occupied(&self) -> usize {
        let mut state = self.state.lock();
        state.prune(Instant::now(), self.window);
        state.in_flight + state.released.len()
    }
}

impl Limiter for SlidingWindowLimiter {
    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        state.prune(Instant::now(), self.window);
        if state.in_flight + state.released.len() >= self.max {
            return false;
        }
        state.in_flight += 1;
        true
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.released.push_back(Instant::now());
    }

    fn describe(&self) -> String {
        format!("sliding_window(max={}, window={:?})", self.max, self.window)
    }
}
