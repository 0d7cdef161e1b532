//! Admission control contract.
//!
//! A limiter decides, under concurrent pressure, whether the pool may start
//! another job right now. The pool depends only on this trait; strategies
//! live in [`crate::infra::limiter`].

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Pluggable admission controller shared by every worker of a pool.
///
/// Implementations keep their counters private and synchronized; callers
/// never hold a limiter lock across an await point.
pub trait Limiter: Send + Sync + 'static {
    /// Startup behaviour (e.g. a periodic window reset).
    ///
    /// Called exactly once per limiter by the pool that owns it. Background
    /// work must stop when `shutdown` is cancelled; the returned handle lets
    /// the pool join it on shutdown.
    fn init(&self, shutdown: &CancellationToken) -> Option<JoinHandle<()>> {
        let _ = shutdown;
        None
    }

    /// Try to reserve capacity for one job. Never blocks.
    fn try_acquire(&self) -> bool;

    /// Return capacity reserved by a successful [`Limiter::try_acquire`].
    ///
    /// Must be called exactly once per successful acquire. Calling it without
    /// a matching acquire corrupts the limiter's accounting; this is a caller
    /// precondition and is not checked.
    fn release(&self);

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}
