//! Builder turning a [`PoolConfig`] into a running [`JobPool`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LimiterConfig, PoolConfig, PoolOption};
use crate::core::{JobPool, Limiter, MetricsSink, PoolError};
use crate::infra::{ConcurrencyLimiter, MetricsRegistry, SlidingWindowLimiter, WindowLimiter};

/// Namespace of the registry created when metrics are enabled.
pub const DEFAULT_METRICS_NAMESPACE: &str = "job_pool";

/// Build the limiter described by the configuration.
#[must_use]
pub fn build_limiter(cfg: &LimiterConfig) -> Arc<dyn Limiter> {
    match *cfg {
        LimiterConfig::Concurrency { max } => Arc::new(ConcurrencyLimiter::new(max)),
        LimiterConfig::PerWindow { max, window_ms } => Arc::new(WindowLimiter::with_window(
            max,
            Duration::from_millis(window_ms),
        )),
        LimiterConfig::SlidingWindow { max, window_ms } => Arc::new(SlidingWindowLimiter::new(
            max,
            Duration::from_millis(window_ms),
        )),
    }
}

/// Assembles a pool, optionally with a custom limiter or metrics sink.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use prometheus_throttle::builders::PoolBuilder;
/// use prometheus_throttle::config::{PoolConfig, PoolOption};
/// use prometheus_throttle::infra::SlidingWindowLimiter;
///
/// let pool = PoolBuilder::new(PoolConfig::new().with_worker_count(8))
///     .option(PoolOption::Metrics)
///     .limiter(Arc::new(SlidingWindowLimiter::new(50, Duration::from_secs(1))))
///     .start()?;
/// ```
pub struct PoolBuilder {
    config: PoolConfig,
    limiter: Option<Arc<dyn Limiter>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    namespace: String,
}

impl PoolBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            limiter: None,
            metrics: None,
            namespace: DEFAULT_METRICS_NAMESPACE.to_string(),
        }
    }

    /// Apply an option to the configuration.
    #[must_use]
    pub fn option(mut self, option: PoolOption) -> Self {
        self.config.apply(option);
        self
    }

    /// Use this limiter instead of the configured one.
    #[must_use]
    pub fn limiter(mut self, limiter: Arc<dyn Limiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Report to this sink instead of a prometheus registry.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Namespace of the prometheus registry created when metrics are enabled.
    #[must_use]
    pub fn metrics_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Validate the configuration and start the pool.
    ///
    /// # Errors
    /// See [`JobPool::start`].
    pub fn start(self) -> Result<JobPool, PoolError> {
        self.config.validate().map_err(PoolError::InvalidConfig)?;

        let limiter = self
            .limiter
            .unwrap_or_else(|| build_limiter(&self.config.limiter));

        let (sink, registry) = match self.metrics {
            Some(sink) => (Some(sink), None),
            None if self.config.metrics => {
                let registry = Arc::new(MetricsRegistry::with_pool_metrics(self.namespace)?);
                let sink: Arc<dyn MetricsSink> = registry.clone();
                (Some(sink), Some(registry))
            }
            None => (None, None),
        };

        JobPool::launch(self.config, limiter, sink, registry)
    }
}
