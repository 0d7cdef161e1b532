//! Observability hooks.
//!
//! The pool reports lifecycle events by metric name; what happens with them
//! is up to the sink. [`MetricsRegistry`](crate::infra::MetricsRegistry) is
//! the prometheus-backed implementation.

/// Jobs accepted by the dispatcher.
pub const RECEIVED: &str = "received";
/// Jobs placed on the ready path.
pub const ENQUEUED: &str = "enqueued";
/// Jobs that completed a run, successfully or not.
pub const PROCESSED: &str = "processed";
/// Jobs parked in the delayed set.
pub const SCHEDULED: &str = "scheduled";
/// Runs that returned an error or panicked.
pub const ERRORED: &str = "erroed";
/// Runs that exceeded the deadline.
pub const TIMEOUT: &str = "timeout";
/// Admission denials.
pub const RATE_LIMITED: &str = "rate_limited";

/// Counters registered by a pool with metrics enabled, with help text.
pub const POOL_COUNTERS: [(&str, &str); 7] = [
    (RECEIVED, "Jobs received by the dispatcher"),
    (ENQUEUED, "Jobs placed on the ready path"),
    (PROCESSED, "Jobs that finished running"),
    (SCHEDULED, "Jobs parked until their scheduled instant"),
    (ERRORED, "Job runs that failed"),
    (TIMEOUT, "Job runs that exceeded the deadline"),
    (RATE_LIMITED, "Admission denials"),
];

/// Gauges registered by a pool with metrics enabled, with help text.
pub const POOL_GAUGES: [(&str, &str); 3] = [
    (ENQUEUED, "Jobs currently waiting on the ready path or running"),
    (PROCESSED, "Jobs processed"),
    (SCHEDULED, "Jobs currently parked in the delayed set"),
];

/// Sink for named counters and gauges.
///
/// `increment` bumps every counter and gauge carrying one of the names;
/// `decrement` only touches gauges. Unknown names are ignored.
pub trait MetricsSink: Send + Sync + 'static {
    /// Increment the named metrics by one.
    fn increment(&self, names: &[&str]);

    /// Decrement the named gauges by one.
    fn decrement(&self, names: &[&str]);
}
