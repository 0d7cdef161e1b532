//! # Prometheus Throttle
//!
//! A throttled job pool for workloads that must respect an upstream limit:
//! third-party APIs with per-second quotas, GPU-bound inference with a fixed
//! number of slots, batch pipelines that should not swamp a database.
//!
//! Jobs are handed to a dispatcher, routed either straight to a shared ready
//! path or into a delayed set keyed by their scheduled instant, and executed
//! by a fixed number of workers. Every worker asks one shared admission
//! controller before running a job; denied jobs are retried after a short
//! backoff instead of being dropped.
//!
//! ## Key Features
//!
//! - **Admission control**: fixed-concurrency, fixed-rate-per-window and
//!   sliding-window limiters behind the [`core::Limiter`] trait
//! - **Delayed jobs**: jobs carrying a scheduled instant are parked and
//!   promoted by a periodic sweep, never run early
//! - **Per-job deadline**: jobs exceeding the timeout are reported and
//!   detached; the worker moves on
//! - **Repeatable jobs**: a job can ask to be run again after each success
//! - **Error path**: failures are published asynchronously on an
//!   [`core::ErrorStream`], never returned to the submitter
//! - **Metrics**: optional prometheus counters and gauges
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use prometheus_throttle::config::PoolOption;
//! use prometheus_throttle::core::{create, FnJob};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (submitter, errors, shutdown) =
//!         create(4, [PoolOption::RateLimit(10), PoolOption::Metrics])?;
//!
//!     submitter.submit(FnJob::new(|ctx| async move {
//!         tracing::info!(worker_id = ctx.worker_id(), "hello");
//!         Ok(())
//!     }))?;
//!
//!     tokio::spawn(async move {
//!         while let Some(failure) = errors.recv().await {
//!             tracing::warn!(%failure, "job failed");
//!         }
//!     });
//!
//!     shutdown.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! For full control over the limiter or the metrics sink, see
//! [`builders::PoolBuilder`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core job-pool abstractions: jobs, admission control, workers and the pool.
pub mod core;
/// Configuration models for pools, limiters, and timeouts.
pub mod config;
/// Builders to construct job pools from configuration.
pub mod builders;
/// Infrastructure adapters: limiter strategies, the delayed set and metrics.
pub mod infra;
/// Shared utilities.
pub mod util;

pub use crate::config::{LimiterConfig, PoolConfig, PoolOption};
pub use crate::core::{
    create, AppResult, ErrorStream, FnJob, Job, JobContext, JobFailure, JobPool, Limiter,
    PoolError, Shutdown, Submitter,
};
