//! Builders to construct job pools from configuration.

pub mod pool_builder;

pub use pool_builder::{build_limiter, PoolBuilder, DEFAULT_METRICS_NAMESPACE};
