//! Tests for the metrics registry

use prometheus_throttle::core::metrics::{MetricsSink, POOL_COUNTERS, POOL_GAUGES};
use prometheus_throttle::core::MetricsError;
use prometheus_throttle::infra::MetricsRegistry;

#[test]
fn test_pool_metrics_are_registered() {
    let metrics = MetricsRegistry::with_pool_metrics("unit").unwrap();
    for (name, _) in POOL_COUNTERS {
        assert_eq!(metrics.counter_value(name), Some(0), "counter {name}");
    }
    for (name, _) in POOL_GAUGES {
        assert_eq!(metrics.gauge_value(name), Some(0), "gauge {name}");
    }
    assert_eq!(metrics.gauge_value("received"), None);
}

#[test]
fn test_increment_many_names() {
    let metrics = MetricsRegistry::with_pool_metrics("unit").unwrap();
    metrics.increment(&["received", "scheduled"]);
    metrics.decrement(&["scheduled", "received"]);

    assert_eq!(metrics.counter_value("received"), Some(1));
    assert_eq!(metrics.counter_value("scheduled"), Some(1));
    assert_eq!(metrics.gauge_value("scheduled"), Some(0));
}

#[test]
fn test_registries_are_independent() {
    let first = MetricsRegistry::with_pool_metrics("job_pool").unwrap();
    let second = MetricsRegistry::with_pool_metrics("job_pool").unwrap();
    first.increment(&["erroed"]);

    assert_eq!(first.counter_value("erroed"), Some(1));
    assert_eq!(second.counter_value("erroed"), Some(0));
}

#[test]
fn test_duplicate_registration_fails() {
    let metrics = MetricsRegistry::with_pool_metrics("unit").unwrap();
    let err = metrics.register_counter("timeout", "again").unwrap_err();
    assert!(matches!(err, MetricsError::AlreadyRegistered(name) if name == "timeout"));
}

#[test]
fn test_encode_text_exposition() {
    let metrics = MetricsRegistry::new("svc");
    metrics.register_counter("calls", "Calls made").unwrap();
    metrics.increment(&["calls"]);

    let text = metrics.encode_text().unwrap();
    assert!(text.contains("# HELP svc_calls_total Calls made"));
    assert!(text.contains("# TYPE svc_calls_total counter"));
    assert!(text.contains("svc_calls_total 1"));
}
