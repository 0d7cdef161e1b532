//! Job capability contract and execution context.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::AppResult;

/// A unit of work accepted by the pool.
///
/// `run` is the only required operation. Scheduling and repetition are
/// optional capabilities expressed through provided methods; the pool queries
/// them once, when the job is received, and never inspects the job's type
/// afterwards.
///
/// A job has no identity beyond the value itself and the pool does not
/// deduplicate submissions.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_throttle::core::{AppResult, Job, JobContext};
///
/// struct FetchTimeline {
///     remaining_pages: u32,
/// }
///
/// #[async_trait]
/// impl Job for FetchTimeline {
///     async fn run(&mut self, _ctx: &JobContext) -> AppResult<()> {
///         // call the rate-limited API here
///         Ok(())
///     }
///
///     fn is_repeatable(&self) -> bool {
///         true
///     }
///
///     fn should_repeat(&mut self) -> bool {
///         self.remaining_pages = self.remaining_pages.saturating_sub(1);
///         self.remaining_pages > 0
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + 'static {
    /// Perform the work.
    ///
    /// Failures are published on the pool's error path. Long-running jobs
    /// should watch [`JobContext::cancelled`]: once the deadline elapses the
    /// pool stops tracking the job but does not abort it.
    async fn run(&mut self, ctx: &JobContext) -> AppResult<()>;

    /// Absolute instant (ms since the Unix epoch) before which the job must
    /// not start. `None` routes the job straight to the ready path.
    fn scheduled_at_ms(&self) -> Option<u128> {
        None
    }

    /// Whether the job takes part in the repeat protocol.
    fn is_repeatable(&self) -> bool {
        false
    }

    /// Continuation check, called after every successful, non-timed-out run
    /// of a repeatable job. Returning `true` re-submits the job unchanged.
    fn should_repeat(&mut self) -> bool {
        false
    }
}

/// Context handed to every job run.
#[derive(Debug, Clone)]
pub struct JobContext {
    worker_id: usize,
    deadline: Duration,
    cancellation: CancellationToken,
}

impl JobContext {
    pub(crate) const fn new(
        worker_id: usize,
        deadline: Duration,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            worker_id,
            deadline,
            cancellation,
        }
    }

    /// Identity of the worker running the job.
    #[must_use]
    pub const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Deadline the worker enforces on this run.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Whether the pool asked the job to stop (deadline elapsed or shutdown).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the pool asks the job to stop.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

type RepeatCheck = Box<dyn FnMut() -> bool + Send>;

/// Job built from a closure, with optional scheduling and repeat fields.
///
/// ```rust,ignore
/// use std::time::Duration;
/// use prometheus_throttle::core::FnJob;
/// use prometheus_throttle::util::ms_from_now;
///
/// let mut rounds = 3;
/// let job = FnJob::new(|_ctx| async { Ok(()) })
///     .scheduled_at(ms_from_now(Duration::from_secs(5)))
///     .repeat_while(move || {
///         rounds -= 1;
///         rounds > 0
///     });
/// ```
pub struct FnJob<F> {
    f: F,
    scheduled_at_ms: Option<u128>,
    repeat: Option<RepeatCheck>,
}

impl<F, Fut> FnJob<F>
where
    F: FnMut(JobContext) -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    /// Wrap a closure producing the job body.
    pub fn new(f: F) -> Self {
        Self {
            f,
            scheduled_at_ms: None,
            repeat: None,
        }
    }

    /// Defer the job until the given instant (ms since the Unix epoch).
    #[must_use]
    pub const fn scheduled_at(mut self, at_ms: u128) -> Self {
        self.scheduled_at_ms = Some(at_ms);
        self
    }

    /// Make the job repeatable, continuing while `check` returns `true`.
    #[must_use]
    pub fn repeat_while<C>(mut self, check: C) -> Self
    where
        C: FnMut() -> bool + Send + 'static,
    {
        self.repeat = Some(Box::new(check));
        self
    }
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: FnMut(JobContext) -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn run(&mut self, ctx: &JobContext) -> AppResult<()> {
        (self.f)(ctx.clone()).await
    }

    fn scheduled_at_ms(&self) -> Option<u128> {
        self.scheduled_at_ms
    }

    fn is_repeatable(&self) -> bool {
        self.repeat.is_some()
    }

    fn should_repeat(&mut self) -> bool {
        self.repeat.as_mut().is_some_and(|check| check())
    }
}

/// A job together with the capabilities resolved when it was received.
pub(crate) struct Envelope {
    pub job: Box<dyn Job>,
    pub repeatable: bool,
    /// Consecutive admission denials, drives the retry backoff.
    pub denials: u32,
}

impl Envelope {
    pub(crate) fn new(job: Box<dyn Job>) -> Self {
        let repeatable = job.is_repeatable();
        Self {
            job,
            repeatable,
            denials: 0,
        }
    }
}
