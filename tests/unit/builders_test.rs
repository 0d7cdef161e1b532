//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus_throttle::builders::{build_limiter, PoolBuilder};
use prometheus_throttle::config::{LimiterConfig, PoolConfig, PoolOption};
use prometheus_throttle::core::{MetricsSink, PoolError};
use prometheus_throttle::infra::ConcurrencyLimiter;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl MetricsSink for RecordingSink {
    fn increment(&self, names: &[&str]) {
        self.events
            .lock()
            .extend(names.iter().map(|n| format!("+{n}")));
    }

    fn decrement(&self, names: &[&str]) {
        self.events
            .lock()
            .extend(names.iter().map(|n| format!("-{n}")));
    }
}

#[test]
fn test_build_limiter_per_window() {
    let limiter = build_limiter(&LimiterConfig::PerWindow {
        max: 1,
        window_ms: 250,
    });
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
    assert_eq!(limiter.describe(), "per_window(max=1, window=250ms)");
}

#[test]
fn test_builder_outside_runtime() {
    let result = PoolBuilder::new(PoolConfig::new().with_worker_count(1)).start();
    assert!(matches!(result, Err(PoolError::NoRuntime)));
}

#[tokio::test]
async fn test_builder_with_metrics_option_exposes_registry() {
    let pool = PoolBuilder::new(PoolConfig::new().with_worker_count(1))
        .option(PoolOption::Metrics)
        .metrics_namespace("builder_test")
        .start()
        .unwrap();

    let registry = pool.metrics_registry().expect("registry");
    assert_eq!(registry.namespace(), "builder_test");
    assert_eq!(registry.counter_value("received"), Some(0));
    pool.shutdown().await;
}

#[tokio::test]
async fn test_builder_custom_limiter_and_sink() {
    let sink = Arc::new(RecordingSink::default());
    let pool = PoolBuilder::new(PoolConfig::new().with_worker_count(1))
        .limiter(Arc::new(ConcurrencyLimiter::new(7)))
        .metrics_sink(sink.clone())
        .start()
        .unwrap();

    assert_eq!(pool.limiter().describe(), "concurrency(max=7)");
    assert!(pool.metrics_registry().is_none());

    pool.submit(prometheus_throttle::FnJob::new(|_ctx| async { Ok(()) }))
        .unwrap();
    for _ in 0..100 {
        if sink.events.lock().iter().any(|e| e == "-enqueued") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    pool.shutdown().await;

    let events = sink.events.lock().clone();
    assert_eq!(
        events,
        vec!["+received", "+enqueued", "+processed", "-enqueued"]
    );
}
