//! Pool configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of every environment variable read by [`PoolConfig::from_env`].
pub const ENV_PREFIX: &str = "THROTTLE_";

const fn default_window_ms() -> u64 {
    1000
}

/// Admission strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimiterConfig {
    /// At most `max` jobs running at once.
    Concurrency {
        /// Concurrent job ceiling.
        max: usize,
    },
    /// At most `max` jobs started per window, reset at fixed boundaries.
    PerWindow {
        /// Per-window ceiling.
        max: usize,
        /// Window length in milliseconds.
        #[serde(default = "default_window_ms")]
        window_ms: u64,
    },
    /// At most `max` jobs per rolling window.
    SlidingWindow {
        /// Per-window ceiling.
        max: usize,
        /// Window length in milliseconds.
        #[serde(default = "default_window_ms")]
        window_ms: u64,
    },
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::Concurrency { max: 1000 }
    }
}

impl LimiterConfig {
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Concurrency { .. } => Ok(()),
            Self::PerWindow { window_ms, .. } | Self::SlidingWindow { window_ms, .. } => {
                if *window_ms == 0 {
                    return Err("limiter window_ms must be greater than 0".into());
                }
                Ok(())
            }
        }
    }

    fn parse(kind: &str, max: usize, window_ms: u64) -> Result<Self, String> {
        match kind {
            "concurrency" => Ok(Self::Concurrency { max }),
            "per_window" => Ok(Self::PerWindow { max, window_ms }),
            "sliding_window" => Ok(Self::SlidingWindow { max, window_ms }),
            other => Err(format!("unknown limiter kind `{other}`")),
        }
    }
}

/// Options applied in order by [`create`](crate::core::create).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOption {
    /// Fixed-concurrency limiter with the given ceiling.
    ConcurrencyLimit(usize),
    /// Fixed-rate limiter admitting the given number of jobs per second.
    RateLimit(usize),
    /// Sliding-window limiter admitting the given number of jobs per second.
    SlidingRateLimit(usize),
    /// Register the pool counters and gauges.
    Metrics,
    /// Per-job deadline.
    JobTimeout(Duration),
    /// Period of the delayed-job promotion sweep.
    SweepInterval(Duration),
    /// Base delay before a denied job is offered again.
    RetryBackoff(Duration),
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

const fn default_job_timeout_ms() -> u64 {
    30_000
}

const fn default_sweep_interval_ms() -> u64 {
    1000
}

const fn default_retry_backoff_ms() -> u64 {
    10
}

const fn default_retry_backoff_max_ms() -> u64 {
    1000
}

const fn default_shutdown_grace_ms() -> u64 {
    2000
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Job pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of workers pulling from the ready path.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Admission strategy shared by all workers.
    #[serde(default)]
    pub limiter: LimiterConfig,
    /// Whether to register the pool counters and gauges.
    #[serde(default)]
    pub metrics: bool,
    /// Per-job deadline in milliseconds.
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,
    /// Promotion sweep period in milliseconds.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Base retry delay after an admission denial; 0 retries immediately.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Upper bound of the retry delay.
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,
    /// Time granted to the background tasks, together, to exit during shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            limiter: LimiterConfig::default(),
            metrics: false,
            job_timeout_ms: default_job_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers.
    #[must_use]
    pub const fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the admission strategy.
    #[must_use]
    pub const fn with_limiter(mut self, limiter: LimiterConfig) -> Self {
        self.limiter = limiter;
        self
    }

    /// Enable or disable metrics.
    #[must_use]
    pub const fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }

    /// Set the per-job deadline.
    #[must_use]
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the promotion sweep period.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = duration_ms(interval);
        self
    }

    /// Set the base retry delay after a denial.
    #[must_use]
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.retry_backoff_ms = duration_ms(base);
        self.retry_backoff_max_ms = self.retry_backoff_max_ms.max(self.retry_backoff_ms);
        self
    }

    /// Set the upper bound of the retry delay.
    #[must_use]
    pub fn with_retry_backoff_max(mut self, max: Duration) -> Self {
        self.retry_backoff_max_ms = duration_ms(max);
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = duration_ms(grace);
        self
    }

    /// Apply a single option; later options override earlier ones.
    pub fn apply(&mut self, option: PoolOption) {
        match option {
            PoolOption::ConcurrencyLimit(max) => self.limiter = LimiterConfig::Concurrency { max },
            PoolOption::RateLimit(max) => {
                self.limiter = LimiterConfig::PerWindow {
                    max,
                    window_ms: default_window_ms(),
                };
            }
            PoolOption::SlidingRateLimit(max) => {
                self.limiter = LimiterConfig::SlidingWindow {
                    max,
                    window_ms: default_window_ms(),
                };
            }
            PoolOption::Metrics => self.metrics = true,
            PoolOption::JobTimeout(timeout) => self.job_timeout_ms = duration_ms(timeout),
            PoolOption::SweepInterval(interval) => {
                self.sweep_interval_ms = duration_ms(interval);
            }
            PoolOption::RetryBackoff(base) => {
                self.retry_backoff_ms = duration_ms(base);
                self.retry_backoff_max_ms = self.retry_backoff_max_ms.max(self.retry_backoff_ms);
            }
        }
    }

    /// Per-job deadline.
    #[must_use]
    pub const fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    /// Promotion sweep period.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Base retry delay after a denial.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Upper bound of the retry delay.
    #[must_use]
    pub const fn retry_backoff_max(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_max_ms)
    }

    /// Shutdown grace period shared by all background tasks.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.job_timeout_ms == 0 {
            return Err("job_timeout_ms must be greater than 0".into());
        }
        if self.sweep_interval_ms == 0 {
            return Err("sweep_interval_ms must be greater than 0".into());
        }
        if self.retry_backoff_max_ms < self.retry_backoff_ms {
            return Err("retry_backoff_max_ms must not be lower than retry_backoff_ms".into());
        }
        self.limiter.validate()
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `THROTTLE_*` environment variables, loading a
    /// `.env` file first when one is present.
    ///
    /// # Errors
    /// Returns a description of the first malformed variable or invalid value.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup, starting from defaults.
    ///
    /// Recognised keys (with [`ENV_PREFIX`]): `WORKERS`, `LIMITER`
    /// (`concurrency`, `per_window`, `sliding_window`), `LIMIT_MAX`,
    /// `LIMIT_WINDOW_MS`, `METRICS`, `JOB_TIMEOUT_MS`, `SWEEP_INTERVAL_MS`,
    /// `RETRY_BACKOFF_MS`, `RETRY_BACKOFF_MAX_MS`, `SHUTDOWN_GRACE_MS`.
    ///
    /// # Errors
    /// Returns a description of the first malformed variable or invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(value) = var("WORKERS") {
            cfg.worker_count = parse_var("WORKERS", &value)?;
        }
        if let Some(value) = var("METRICS") {
            cfg.metrics = parse_bool("METRICS", &value)?;
        }
        if let Some(value) = var("JOB_TIMEOUT_MS") {
            cfg.job_timeout_ms = parse_var("JOB_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = var("SWEEP_INTERVAL_MS") {
            cfg.sweep_interval_ms = parse_var("SWEEP_INTERVAL_MS", &value)?;
        }
        if let Some(value) = var("RETRY_BACKOFF_MS") {
            cfg.retry_backoff_ms = parse_var("RETRY_BACKOFF_MS", &value)?;
        }
        if let Some(value) = var("RETRY_BACKOFF_MAX_MS") {
            cfg.retry_backoff_max_ms = parse_var("RETRY_BACKOFF_MAX_MS", &value)?;
        }
        if let Some(value) = var("SHUTDOWN_GRACE_MS") {
            cfg.shutdown_grace_ms = parse_var("SHUTDOWN_GRACE_MS", &value)?;
        }

        let kind = var("LIMITER");
        let max = var("LIMIT_MAX");
        if kind.is_some() || max.is_some() {
            let kind = kind.unwrap_or_else(|| "concurrency".to_string());
            let max = match max {
                Some(value) => parse_var("LIMIT_MAX", &value)?,
                None => 1000,
            };
            let window_ms = match var("LIMIT_WINDOW_MS") {
                Some(value) => parse_var("LIMIT_WINDOW_MS", &value)?,
                None => default_window_ms(),
            };
            cfg.limiter = LimiterConfig::parse(kind.trim(), max, window_ms)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("{ENV_PREFIX}{name}: invalid boolean `{other}`")),
    }
}
