//! Infrastructure adapters: limiter strategies, the delayed set and metrics.

pub mod limiter;
pub mod metrics;
pub mod queue;

pub use limiter::{ConcurrencyLimiter, SlidingWindowLimiter, WindowLimiter};
pub use metrics::MetricsRegistry;
pub use queue::DelayedSet;
