//! Tests for utility helpers

use std::time::Duration;

use prometheus_throttle::util::{init_tracing, ms_from_now, now_ms};

#[test]
fn test_ms_from_now_is_in_the_future() {
    let now = now_ms();
    let later = ms_from_now(Duration::from_millis(500));
    assert!(later >= now + 500);
    assert!(later < now + 60_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
