//! Tests for error types

use std::time::Duration;

use prometheus_throttle::core::{JobFailure, MetricsError, PoolError};

#[test]
fn test_job_error_message() {
    let err = JobFailure::Failed {
        worker_id: 1,
        cause: anyhow::anyhow!("error!"),
    };
    assert_eq!(format!("{err}"), "job error on worker 1: error!");
}

#[test]
fn test_job_timeout_message() {
    let err = JobFailure::TimedOut {
        worker_id: 2,
        deadline: Duration::from_secs(30),
    };
    assert_eq!(format!("{err}"), "job timeout (30 sec) on worker 2");
}

#[test]
fn test_job_timeout_message_fractional_deadline() {
    let err = JobFailure::TimedOut {
        worker_id: 4,
        deadline: Duration::from_millis(250),
    };
    assert_eq!(format!("{err}"), "job timeout (0.25 sec) on worker 4");
}

#[test]
fn test_job_panic_message() {
    let err = JobFailure::Panicked {
        worker_id: 3,
        message: "index out of bounds".to_string(),
    };
    assert_eq!(
        format!("{err}"),
        "job panicked on worker 3: index out of bounds"
    );
    assert_eq!(err.worker_id(), 3);
}

#[test]
fn test_pool_error_messages() {
    assert_eq!(
        PoolError::InvalidConfig("worker_count must be greater than 0".into()).to_string(),
        "invalid configuration: worker_count must be greater than 0"
    );
    assert_eq!(
        PoolError::NoRuntime.to_string(),
        "no tokio runtime available to start the pool"
    );
    assert_eq!(PoolError::PoolShutdown.to_string(), "pool has been shut down");
}

#[test]
fn test_metrics_error_messages() {
    assert_eq!(
        MetricsError::AlreadyRegistered("received".into()).to_string(),
        "metric 'received' already registered"
    );
    assert_eq!(
        MetricsError::NotRegistered("gone".into()).to_string(),
        "metric 'gone' not registered"
    );
}
