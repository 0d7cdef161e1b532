//! Tests for limiter strategies

use std::sync::Arc;
use std::time::Duration;

use prometheus_throttle::core::Limiter;
use prometheus_throttle::infra::limiter::{
    ConcurrencyLimiter, SlidingWindowLimiter, WindowCounts, WindowLimiter,
};

#[test]
fn test_concurrency_limit_m_then_denied() {
    let limiter = ConcurrencyLimiter::new(3);
    for _ in 0..3 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());

    limiter.release();
    assert!(limiter.try_acquire());
    assert_eq!(limiter.in_use(), 3);
}

#[test]
fn test_concurrency_zero_never_admits() {
    let limiter = ConcurrencyLimiter::new(0);
    assert!(!limiter.try_acquire());
}

#[test]
fn test_window_counts_invariant_under_threads() {
    let limiter = Arc::new(WindowLimiter::with_window(10, Duration::from_secs(60)));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || {
                let mut granted = 0;
                for _ in 0..50 {
                    if limiter.try_acquire() {
                        granted += 1;
                        limiter.release();
                    }
                }
                granted
            })
        })
        .collect();

    let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(granted, 10);
    assert_eq!(
        limiter.counts(),
        WindowCounts {
            started: 0,
            finished: 10
        }
    );
}

#[test]
fn test_window_limiter_counts_running_jobs() {
    let limiter = WindowLimiter::new(2);
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
    limiter.release();
    assert!(!limiter.try_acquire());
}

#[test]
fn test_limiters_as_trait_objects() {
    let limiters: Vec<Arc<dyn Limiter>> = vec![
        Arc::new(ConcurrencyLimiter::new(1)),
        Arc::new(WindowLimiter::new(1)),
        Arc::new(SlidingWindowLimiter::new(1, Duration::from_secs(1))),
    ];
    for limiter in limiters {
        assert!(limiter.try_acquire(), "{}", limiter.describe());
        assert!(!limiter.try_acquire(), "{}", limiter.describe());
    }
}
