//! Fixed-concurrency limiter.

use parking_lot::Mutex;

use crate::core::Limiter;

/// Caps the number of jobs running at the same time across the whole pool,
/// independent of wall-clock time.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    max: usize,
    in_use: Mutex<usize>,
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting at most `max` concurrent jobs.
    ///
    /// `max == 0` denies every acquire.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self {
            max,
            in_use: Mutex::new(0),
        }
    }

    /// Configured ceiling.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Jobs currently holding capacity.
    #[must_use]
    pub fn in_use(&self) -> usize {
        *self.in_use.lock()
    }
}

impl Limiter for ConcurrencyLimiter {
    fn try_acquire(&self) -> bool {
        let mut in_use = self.in_use.lock();
        if *in_use >= self.max {
            return false;
        }
        *in_use += 1;
        true
    }

    fn release(&self) {
        let mut in_use = self.in_use.lock();
        *in_use = in_use.saturating_sub(1);
    }

    fn describe(&self) -> String {
        format!("concurrency(max={})", self.max)
    }
}
