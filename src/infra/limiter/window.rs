//! Fixed-rate-per-window limiter.
//!
//! Capacity is a ceiling on jobs started within a window. The window is
//! approximated with a periodic hard reset of the finished count rather than a
//! true sliding window: a job released just before a reset and one started
//! just after can both count in the "same" second, so short bursts of up to
//! roughly twice the ceiling are possible at window boundaries. Use
//! [`SlidingWindowLimiter`](super::SlidingWindowLimiter) when that matters.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::Limiter;

/// Window length used when none is configured.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Shortest accepted window; shorter ones are raised to it.
pub const MIN_WINDOW: Duration = Duration::from_millis(1);

/// Counter snapshot of a [`WindowLimiter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    /// Jobs admitted and not yet released.
    pub started: usize,
    /// Jobs released since the last window reset.
    pub finished: usize,
}

/// Admits at most `max` jobs per window; a job counts against the budget
/// until its window elapses, not until it returns.
#[derive(Debug)]
pub struct WindowLimiter {
    max: usize,
    window: Duration,
    counts: Arc<Mutex<WindowCounts>>,
}

impl WindowLimiter {
    /// Create a limiter with the default one-second window.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self::with_window(max, DEFAULT_WINDOW)
    }

    /// Create a limiter with a custom window length.
    ///
    /// Windows shorter than [`MIN_WINDOW`] (including zero) are raised to it.
    #[must_use]
    pub fn with_window(max: usize, window: Duration) -> Self {
        Self {
            max,
            window: window.max(MIN_WINDOW),
            counts: Arc::new(Mutex::new(WindowCounts::default())),
        }
    }

    /// Configured per-window ceiling.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Configured window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Current counters.
    #[must_use]
    pub fn counts(&self) -> WindowCounts {
        *self.counts.lock()
    }

    /// Forget the jobs finished in the current window.
    pub fn reset_window(&self) {
        self.counts.lock().finished = 0;
    }
}

impl Limiter for WindowLimiter {
    fn init(&self, shutdown: &CancellationToken) -> Option<JoinHandle<()>> {
        let counts = Arc::clone(&self.counts);
        let window = self.window;
        let shutdown = shutdown.clone();

        Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + window, window);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        counts.lock().finished = 0;
                    }
                }
            }
            debug!("window limiter reset task stopped");
        }))
    }

    fn try_acquire(&self) -> bool {
        let mut counts = self.counts.lock();
        if counts.started + counts.finished >= self.max {
            return false;
        }
        counts.started += 1;
        true
    }

    fn release(&self) {
        let mut counts = self.counts.lock();
        counts.started = counts.started.saturating_sub(1);
        counts.finished += 1;
    }

    fn describe(&self) -> String {
        format!("per_window(max={}, window={:?})", self.max, self.window)
    }
}
