//! Configuration models for pools, limiters, and timeouts.

pub mod pool;

pub use pool::{LimiterConfig, PoolConfig, PoolOption, ENV_PREFIX};
