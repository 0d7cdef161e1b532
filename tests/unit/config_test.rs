//! Tests for configuration validation

use std::time::Duration;

use prometheus_throttle::config::{LimiterConfig, PoolConfig, PoolOption};

#[test]
fn test_pool_config_validation() {
    let valid = PoolConfig::new()
        .with_worker_count(4)
        .with_job_timeout(Duration::from_secs(5));
    assert!(valid.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_worker_count() {
    let invalid = PoolConfig::new().with_worker_count(0);
    assert_eq!(
        invalid.validate().unwrap_err(),
        "worker_count must be greater than 0"
    );
}

#[test]
fn test_pool_config_invalid_timeout() {
    let invalid = PoolConfig::new().with_job_timeout(Duration::ZERO);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_sweep_interval() {
    let invalid = PoolConfig::new().with_sweep_interval(Duration::ZERO);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_window() {
    let invalid = PoolConfig::new().with_limiter(LimiterConfig::PerWindow {
        max: 5,
        window_ms: 0,
    });
    assert_eq!(
        invalid.validate().unwrap_err(),
        "limiter window_ms must be greater than 0"
    );
}

#[test]
fn test_pool_config_backoff_cap_below_base() {
    let invalid = PoolConfig::new()
        .with_retry_backoff(Duration::from_millis(100))
        .with_retry_backoff_max(Duration::from_millis(50));
    assert!(invalid.validate().is_err());
}

#[test]
fn test_zero_limit_is_valid() {
    let cfg = PoolConfig::new().with_limiter(LimiterConfig::Concurrency { max: 0 });
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_from_json_str_with_defaults() {
    let json = r#"{
        "worker_count": 2,
        "limiter": { "kind": "per_window", "max": 10 },
        "metrics": true
    }"#;

    let cfg = PoolConfig::from_json_str(json).expect("should parse");
    assert_eq!(cfg.worker_count, 2);
    assert_eq!(
        cfg.limiter,
        LimiterConfig::PerWindow {
            max: 10,
            window_ms: 1000
        }
    );
    assert!(cfg.metrics);
    assert_eq!(cfg.job_timeout_ms, 30_000);
    assert_eq!(cfg.sweep_interval_ms, 1000);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    let err = PoolConfig::from_json_str(r#"{ "worker_count": 0 }"#).unwrap_err();
    assert_eq!(err, "worker_count must be greater than 0");

    let err = PoolConfig::from_json_str(r#"{ "limiter": { "kind": "bucket", "max": 1 } }"#)
        .unwrap_err();
    assert!(err.starts_with("parse error:"));
}

#[test]
fn test_json_round_trip_keeps_limiter_tag() {
    let cfg = PoolConfig::new().with_limiter(LimiterConfig::SlidingWindow {
        max: 3,
        window_ms: 250,
    });
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains(r#""kind":"sliding_window""#));
    assert_eq!(PoolConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_pool_options() {
    let mut cfg = PoolConfig::new();
    cfg.apply(PoolOption::SlidingRateLimit(4));
    cfg.apply(PoolOption::JobTimeout(Duration::from_millis(1500)));
    cfg.apply(PoolOption::SweepInterval(Duration::from_millis(50)));

    assert_eq!(
        cfg.limiter,
        LimiterConfig::SlidingWindow {
            max: 4,
            window_ms: 1000
        }
    );
    assert_eq!(cfg.job_timeout(), Duration::from_millis(1500));
    assert_eq!(cfg.sweep_interval(), Duration::from_millis(50));
}

#[test]
fn test_from_lookup_without_vars_uses_defaults() {
    let cfg = PoolConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, PoolConfig::default());
}

#[test]
fn test_from_lookup_limit_max_alone_sets_concurrency() {
    let cfg = PoolConfig::from_lookup(|key| {
        (key == "THROTTLE_LIMIT_MAX").then(|| "12".to_string())
    })
    .unwrap();
    assert_eq!(cfg.limiter, LimiterConfig::Concurrency { max: 12 });
}
