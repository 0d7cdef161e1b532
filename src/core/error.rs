//! Error types for pool construction, job failures and metrics.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while building, starting or feeding a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The pool was started outside of a Tokio runtime.
    #[error("no tokio runtime available to start the pool")]
    NoRuntime,
    /// The pool has been shut down and its intake is closed.
    #[error("pool has been shut down")]
    PoolShutdown,
    /// The metrics registry could not be set up.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

/// A failure record published on the error path.
///
/// Job failures never reach the submitter synchronously; workers publish them
/// on the pool's [`ErrorStream`](crate::core::ErrorStream).
#[derive(Debug, Error)]
pub enum JobFailure {
    /// The job's `run` returned an error.
    #[error("job error on worker {worker_id}: {cause}")]
    Failed {
        /// Worker that ran the job.
        worker_id: usize,
        /// Error returned by the job.
        cause: anyhow::Error,
    },
    /// The job did not complete before the configured deadline.
    #[error("job timeout ({} sec) on worker {worker_id}", .deadline.as_secs_f64())]
    TimedOut {
        /// Worker that ran the job.
        worker_id: usize,
        /// Deadline the job exceeded.
        deadline: Duration,
    },
    /// The job panicked while running.
    #[error("job panicked on worker {worker_id}: {message}")]
    Panicked {
        /// Worker that ran the job.
        worker_id: usize,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl JobFailure {
    /// Identity of the worker that reported the failure.
    #[must_use]
    pub const fn worker_id(&self) -> usize {
        match self {
            Self::Failed { worker_id, .. }
            | Self::TimedOut { worker_id, .. }
            | Self::Panicked { worker_id, .. } => *worker_id,
        }
    }

    /// Whether the failure is a deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Errors produced by the metrics registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A metric was registered without a name.
    #[error("metric name should not be empty")]
    EmptyName,
    /// A metric with this name already exists.
    #[error("metric '{0}' already registered")]
    AlreadyRegistered(String),
    /// No metric with this name exists.
    #[error("metric '{0}' not registered")]
    NotRegistered(String),
    /// Error reported by the prometheus client.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// The text exposition was not valid UTF-8.
    #[error("metrics encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Application-facing result using anyhow; job bodies return this.
pub type AppResult<T> = Result<T, anyhow::Error>;
