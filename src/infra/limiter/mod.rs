//! Admission control strategies.

pub mod concurrency;
pub mod sliding;
pub mod window;

pub use concurrency::ConcurrencyLimiter;
pub use sliding::SlidingWindowLimiter;
pub use window::{WindowCounts, WindowLimiter, DEFAULT_WINDOW, MIN_WINDOW};
