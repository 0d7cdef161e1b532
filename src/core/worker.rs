//! Execution unit.
//!
//! A worker pulls envelopes from the shared ready path, asks the limiter for
//! admission, and runs admitted jobs under the pool deadline. Denied jobs are
//! handed back to the ready path by a detached task so the worker is free for
//! the next envelope immediately.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use super::error::JobFailure;
use super::job::{Envelope, Job, JobContext};
use super::metrics::{ENQUEUED, ERRORED, PROCESSED, RATE_LIMITED, TIMEOUT};
use super::pool::PoolShared;

pub(crate) struct Worker {
    id: usize,
    shared: Arc<PoolShared>,
    ready: flume::Receiver<Envelope>,
    errors: flume::Sender<JobFailure>,
}

impl Worker {
    pub(crate) const fn new(
        id: usize,
        shared: Arc<PoolShared>,
        ready: flume::Receiver<Envelope>,
        errors: flume::Sender<JobFailure>,
    ) -> Self {
        Self {
            id,
            shared,
            ready,
            errors,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        debug!(worker_id = self.id, "worker started");
        loop {
            let envelope = tokio::select! {
                biased;
                () = self.shared.shutdown.cancelled() => break,
                received = self.ready.recv_async() => match received {
                    Ok(envelope) => envelope,
                    Err(_) => break,
                },
            };
            self.handle(envelope).await;
        }
        debug!(worker_id = self.id, "worker stopped");
    }

    async fn handle(&self, mut envelope: Envelope) {
        if !self.shared.limiter.try_acquire() {
            self.shared.inc(&[RATE_LIMITED]);
            envelope.denials = envelope.denials.saturating_add(1);
            let delay = self.shared.retry_delay(envelope.denials);
            debug!(
                worker_id = self.id,
                denials = envelope.denials,
                delay = ?delay,
                "admission denied, retrying later"
            );
            retry_later(Arc::clone(&self.shared), envelope, delay);
            return;
        }

        let repeat = self.execute(envelope).await;
        self.shared.limiter.release();
        if let Some(job) = repeat {
            self.maybe_repeat(job);
        }
        self.shared.dec(&[ENQUEUED]);
    }

    /// Run an admitted job under the deadline. Returns the job when it is
    /// repeatable and its run succeeded.
    async fn execute(&self, envelope: Envelope) -> Option<Box<dyn Job>> {
        let Envelope {
            mut job,
            repeatable,
            ..
        } = envelope;
        let deadline = self.shared.job_timeout;
        let cancellation = self.shared.shutdown.child_token();
        let ctx = JobContext::new(self.id, deadline, cancellation.clone());

        let running = tokio::spawn(async move {
            let result = job.run(&ctx).await;
            (job, result)
        });

        match tokio::time::timeout(deadline, running).await {
            Ok(Ok((job, Ok(())))) => {
                self.shared.inc(&[PROCESSED]);
                debug!(worker_id = self.id, "job completed");
                return repeatable.then_some(job);
            }
            Ok(Ok((_, Err(cause)))) => {
                warn!(worker_id = self.id, error = %cause, "job failed");
                self.shared.inc(&[ERRORED]);
                self.publish(JobFailure::Failed {
                    worker_id: self.id,
                    cause,
                });
                self.shared.inc(&[PROCESSED]);
            }
            Ok(Err(join_error)) => {
                let message = panic_message(join_error);
                warn!(worker_id = self.id, message = %message, "job panicked");
                self.shared.inc(&[ERRORED]);
                self.publish(JobFailure::Panicked {
                    worker_id: self.id,
                    message,
                });
                self.shared.inc(&[PROCESSED]);
            }
            Err(_) => {
                cancellation.cancel();
                warn!(
                    worker_id = self.id,
                    deadline = ?deadline,
                    "job timed out, detaching"
                );
                self.shared.inc(&[TIMEOUT]);
                self.publish(JobFailure::TimedOut {
                    worker_id: self.id,
                    deadline,
                });
            }
        }
        None
    }

    fn maybe_repeat(&self, mut job: Box<dyn Job>) {
        if !job.should_repeat() {
            return;
        }
        debug!(worker_id = self.id, "repeating job");
        self.shared.inc(&[ENQUEUED]);
        self.shared.enqueue(Envelope {
            job,
            repeatable: true,
            denials: 0,
        });
    }

    fn publish(&self, failure: JobFailure) {
        if self.errors.send(failure).is_err() {
            debug!(worker_id = self.id, "error stream dropped, failure discarded");
        }
    }
}

/// Offer a denied job again from a separate task, so the denying worker goes
/// back to the ready path instead of spinning on the same envelope.
fn retry_later(shared: Arc<PoolShared>, envelope: Envelope, delay: Duration) {
    tokio::spawn(async move {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            if !shared.shutdown.is_cancelled() {
                shared.enqueue(envelope);
            }
            return;
        }
        tokio::select! {
            () = shared.shutdown.cancelled() => {}
            () = tokio::time::sleep(delay) => shared.enqueue(envelope),
        }
    });
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload: Box<dyn Any + Send> = error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panic_message_extracts_str_and_string() {
        let err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        assert_eq!(panic_message(err), "boom");

        let err = tokio::spawn(async { panic!("{}", String::from("formatted")) })
            .await
            .unwrap_err();
        assert_eq!(panic_message(err), "formatted");
    }
}
