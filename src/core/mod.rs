//! Core job-pool abstractions: jobs, admission control, workers and the pool.

pub mod admission;
pub mod error;
pub mod job;
pub mod metrics;
pub mod pool;
mod worker;

pub use admission::Limiter;
pub use error::{AppResult, JobFailure, MetricsError, PoolError};
pub use job::{FnJob, Job, JobContext};
pub use metrics::MetricsSink;
pub use pool::{create, ErrorStream, JobPool, Shutdown, Submitter};
