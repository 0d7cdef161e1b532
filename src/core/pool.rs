//! Job pool: intake, dispatcher, promotion sweep, workers and shutdown.
//!
//! ```rust,ignore
//! use prometheus_throttle::config::PoolOption;
//! use prometheus_throttle::core::{create, FnJob};
//!
//! let (submitter, errors, shutdown) = create(4, [PoolOption::RateLimit(10)])?;
//! submitter.submit(FnJob::new(|_ctx| async { Ok(()) }))?;
//!
//! while let Some(failure) = errors.try_recv() {
//!     tracing::warn!(%failure, "job failed");
//! }
//! shutdown.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::admission::Limiter;
use super::error::{JobFailure, PoolError};
use super::job::{Envelope, Job};
use super::metrics::{MetricsSink, ENQUEUED, RECEIVED, SCHEDULED};
use super::worker::Worker;
use crate::builders::PoolBuilder;
use crate::config::{PoolConfig, PoolOption};
use crate::infra::queue::DelayedSet;
use crate::infra::MetricsRegistry;
use crate::util::now_ms;

/// Largest doubling exponent applied to the retry backoff.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// State shared by the dispatcher, the sweep and every worker.
pub(crate) struct PoolShared {
    pub(crate) pool_id: Uuid,
    pub(crate) limiter: Arc<dyn Limiter>,
    pub(crate) metrics: Option<Arc<dyn MetricsSink>>,
    pub(crate) delayed: DelayedSet<Envelope>,
    pub(crate) ready: flume::Sender<Envelope>,
    pub(crate) job_timeout: Duration,
    pub(crate) retry_backoff: Duration,
    pub(crate) retry_backoff_max: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl PoolShared {
    pub(crate) fn inc(&self, names: &[&str]) {
        if let Some(metrics) = &self.metrics {
            metrics.increment(names);
        }
    }

    pub(crate) fn dec(&self, names: &[&str]) {
        if let Some(metrics) = &self.metrics {
            metrics.decrement(names);
        }
    }

    /// Place an envelope on the ready path.
    pub(crate) fn enqueue(&self, envelope: Envelope) {
        if self.ready.send(envelope).is_err() {
            debug!(pool_id = %self.pool_id, "ready path closed, job dropped");
        }
    }

    /// Delay before a job denied `denials` times in a row is offered again.
    pub(crate) fn retry_delay(&self, denials: u32) -> Duration {
        if self.retry_backoff.is_zero() {
            return Duration::ZERO;
        }
        let shift = denials.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.retry_backoff
            .saturating_mul(1 << shift)
            .min(self.retry_backoff_max)
    }
}

/// Cloneable handle feeding jobs into a pool.
#[derive(Clone)]
pub struct Submitter {
    intake: flume::Sender<Box<dyn Job>>,
}

impl Submitter {
    /// Hand a job to the pool. Never blocks.
    ///
    /// Submitting after shutdown is a caller error. The pool reports
    /// [`PoolError::PoolShutdown`] once it notices its intake is closed, but an
    /// `Ok` returned around shutdown does not mean the job will run.
    ///
    /// # Errors
    /// [`PoolError::PoolShutdown`] when the dispatcher has stopped.
    pub fn submit<J: Job>(&self, job: J) -> Result<(), PoolError> {
        self.submit_boxed(Box::new(job))
    }

    /// Hand an already boxed job to the pool.
    ///
    /// # Errors
    /// [`PoolError::PoolShutdown`] when the dispatcher has stopped.
    pub fn submit_boxed(&self, job: Box<dyn Job>) -> Result<(), PoolError> {
        self.intake
            .send(job)
            .map_err(|_| PoolError::PoolShutdown)
    }
}

/// Receiving side of the error path.
///
/// Failures queue up without bound until read. The stream ends once the pool
/// has shut down and every worker has exited.
#[derive(Clone)]
pub struct ErrorStream {
    failures: flume::Receiver<JobFailure>,
}

impl ErrorStream {
    /// Wait for the next failure; `None` once the pool is gone.
    pub async fn recv(&self) -> Option<JobFailure> {
        self.failures.recv_async().await.ok()
    }

    /// Take a pending failure without waiting.
    #[must_use]
    pub fn try_recv(&self) -> Option<JobFailure> {
        self.failures.try_recv().ok()
    }

    /// Number of unread failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no failure is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One-shot shutdown signal for a pool.
#[derive(Clone)]
pub struct Shutdown {
    pool_id: Uuid,
    token: CancellationToken,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    grace: Duration,
}

impl Shutdown {
    /// Signal every background task to stop. Idempotent, returns immediately.
    ///
    /// Running jobs see their cancellation token fire; idle workers, the
    /// dispatcher, the sweep and the limiter's reset task exit.
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            info!(pool_id = %self.pool_id, "shutting down job pool");
        }
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait for the background tasks to exit.
    ///
    /// All tasks share one grace period; tasks still busy when it ends (a
    /// worker waiting on a job that ignores cancellation) are detached so
    /// this never hangs. Later calls return immediately.
    pub async fn shutdown(&self) {
        self.trigger();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let task_count = tasks.len();
        let deadline = tokio::time::Instant::now() + self.grace;
        for (idx, task) in tasks.into_iter().enumerate() {
            match tokio::time::timeout_at(deadline, task).await {
                Ok(Ok(())) => debug!(pool_id = %self.pool_id, task = idx, "task joined"),
                Ok(Err(e)) => warn!(pool_id = %self.pool_id, task = idx, error = %e, "task failed"),
                Err(_) => warn!(
                    pool_id = %self.pool_id,
                    task = idx,
                    "task did not exit within grace period - detaching"
                ),
            }
        }

        if task_count > 0 {
            info!(pool_id = %self.pool_id, tasks = task_count, "job pool shut down complete");
        }
    }
}

/// A running job pool.
pub struct JobPool {
    id: Uuid,
    config: PoolConfig,
    shared: Arc<PoolShared>,
    metrics: Option<Arc<MetricsRegistry>>,
    submitter: Submitter,
    errors: ErrorStream,
    shutdown: Shutdown,
}

impl JobPool {
    /// Start a pool from configuration. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// `InvalidConfig` when validation fails, `NoRuntime` outside a runtime,
    /// `Metrics` when metrics registration fails.
    pub fn start(config: PoolConfig) -> Result<Self, PoolError> {
        PoolBuilder::new(config).start()
    }

    pub(crate) fn launch(
        config: PoolConfig,
        limiter: Arc<dyn Limiter>,
        metrics: Option<Arc<dyn MetricsSink>>,
        registry: Option<Arc<MetricsRegistry>>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        Handle::try_current().map_err(|_| PoolError::NoRuntime)?;

        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let (intake_tx, intake_rx) = flume::unbounded();
        let (ready_tx, ready_rx) = flume::unbounded();
        let (error_tx, error_rx) = flume::unbounded();

        let shared = Arc::new(PoolShared {
            pool_id: id,
            limiter,
            metrics,
            delayed: DelayedSet::new(),
            ready: ready_tx,
            job_timeout: config.job_timeout(),
            retry_backoff: config.retry_backoff(),
            retry_backoff_max: config.retry_backoff_max(),
            shutdown: token.clone(),
        });

        let mut tasks = Vec::with_capacity(config.worker_count + 3);
        if let Some(reset) = shared.limiter.init(&token) {
            tasks.push(reset);
        }
        tasks.push(tokio::spawn(dispatch(Arc::clone(&shared), intake_rx)));
        tasks.push(tokio::spawn(sweep(
            Arc::clone(&shared),
            config.sweep_interval(),
        )));
        for worker_id in 1..=config.worker_count {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&shared),
                ready_rx.clone(),
                error_tx.clone(),
            );
            tasks.push(worker.spawn());
        }
        drop(error_tx);

        info!(
            pool_id = %id,
            worker_count = config.worker_count,
            limiter = %shared.limiter.describe(),
            metrics = shared.metrics.is_some(),
            job_timeout_ms = config.job_timeout_ms,
            "job pool started"
        );

        Ok(Self {
            id,
            shutdown: Shutdown {
                pool_id: id,
                token,
                tasks: Arc::new(Mutex::new(tasks)),
                grace: config.shutdown_grace(),
            },
            config,
            shared,
            metrics: registry,
            submitter: Submitter { intake: intake_tx },
            errors: ErrorStream {
                failures: error_rx,
            },
        })
    }

    /// Pool identity recorded on its log events.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration the pool was started with.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Hand a job to the pool.
    ///
    /// # Errors
    /// See [`Submitter::submit`].
    pub fn submit<J: Job>(&self, job: J) -> Result<(), PoolError> {
        self.submitter.submit(job)
    }

    /// A new submit handle.
    #[must_use]
    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    /// The error path.
    #[must_use]
    pub const fn errors(&self) -> &ErrorStream {
        &self.errors
    }

    /// A new shutdown handle.
    #[must_use]
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Prometheus registry, when metrics were enabled through configuration.
    #[must_use]
    pub fn metrics_registry(&self) -> Option<Arc<MetricsRegistry>> {
        self.metrics.clone()
    }

    /// The limiter shared by the workers.
    #[must_use]
    pub fn limiter(&self) -> Arc<dyn Limiter> {
        Arc::clone(&self.shared.limiter)
    }

    /// Number of jobs waiting for their scheduled instant.
    #[must_use]
    pub fn delayed_len(&self) -> usize {
        self.shared.delayed.len()
    }

    /// Split into the three caller handles.
    #[must_use]
    pub fn into_parts(self) -> (Submitter, ErrorStream, Shutdown) {
        (self.submitter, self.errors, self.shutdown)
    }

    /// Signal shutdown and wait for the background tasks.
    pub async fn shutdown(&self) {
        self.shutdown.shutdown().await;
    }
}

/// Start a pool with `worker_count` workers and the given options.
///
/// Options apply in order over the defaults (fixed-concurrency limiter with a
/// ceiling of 1000, no metrics). Must be called inside a Tokio runtime.
///
/// # Errors
/// `InvalidConfig` for a zero worker count or invalid option values,
/// `NoRuntime` outside a runtime.
pub fn create(
    worker_count: usize,
    options: impl IntoIterator<Item = PoolOption>,
) -> Result<(Submitter, ErrorStream, Shutdown), PoolError> {
    let mut config = PoolConfig::default().with_worker_count(worker_count);
    for option in options {
        config.apply(option);
    }
    Ok(JobPool::start(config)?.into_parts())
}

async fn dispatch(shared: Arc<PoolShared>, intake: flume::Receiver<Box<dyn Job>>) {
    debug!(pool_id = %shared.pool_id, "dispatcher started");
    loop {
        let job = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            received = intake.recv_async() => match received {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        shared.inc(&[RECEIVED]);
        let scheduled_at = job.scheduled_at_ms();
        let envelope = Envelope::new(job);
        match scheduled_at {
            Some(at_ms) => {
                shared.delayed.insert(at_ms, envelope);
                shared.inc(&[SCHEDULED]);
                debug!(pool_id = %shared.pool_id, at_ms = %at_ms, "job scheduled");
            }
            None => {
                shared.inc(&[ENQUEUED]);
                shared.enqueue(envelope);
            }
        }
    }
    debug!(pool_id = %shared.pool_id, "dispatcher stopped");
}

async fn sweep(shared: Arc<PoolShared>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let due = shared.delayed.take_due(now_ms());
        if due.is_empty() {
            continue;
        }
        debug!(pool_id = %shared.pool_id, count = due.len(), "promoting scheduled jobs");
        for envelope in due {
            shared.dec(&[SCHEDULED]);
            shared.inc(&[ENQUEUED]);
            shared.enqueue(envelope);
        }
    }
    debug!(pool_id = %shared.pool_id, "promotion sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::limiter::ConcurrencyLimiter;

    fn shared_with_backoff(base_ms: u64, max_ms: u64) -> PoolShared {
        let (ready, _) = flume::unbounded();
        PoolShared {
            pool_id: Uuid::new_v4(),
            limiter: Arc::new(ConcurrencyLimiter::new(1)),
            metrics: None,
            delayed: DelayedSet::new(),
            ready,
            job_timeout: Duration::from_secs(1),
            retry_backoff: Duration::from_millis(base_ms),
            retry_backoff_max: Duration::from_millis(max_ms),
            shutdown: CancellationToken::new(),
        }
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let shared = shared_with_backoff(10, 100);
        assert_eq!(shared.retry_delay(1), Duration::from_millis(10));
        assert_eq!(shared.retry_delay(2), Duration::from_millis(20));
        assert_eq!(shared.retry_delay(4), Duration::from_millis(80));
        assert_eq!(shared.retry_delay(5), Duration::from_millis(100));
        assert_eq!(shared.retry_delay(u32::MAX), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_backoff_retries_immediately() {
        let shared = shared_with_backoff(0, 0);
        assert_eq!(shared.retry_delay(7), Duration::ZERO);
    }

    #[test]
    fn test_create_outside_runtime_fails() {
        let result = create(1, []);
        assert!(matches!(result, Err(PoolError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_workers() {
        let result = create(0, []);
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }
}
