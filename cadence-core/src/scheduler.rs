//! Scheduling capability: delayed execution and idle-time execution.
//!
//! The runtime owns no event loop. It consumes two host primitives —
//! "schedule after delay" and "run during idle time, else fall back to a
//! short delay" — behind the [`Scheduler`] trait, so components can be
//! driven by a real runtime in production and deterministically in tests.

use std::time::Duration;

use futures_util::future::BoxFuture;

/// Delay before an idle-scheduled task runs when the host has no native
/// idle callback. Long enough to yield to interactive work, short enough
/// that warmed caches are useful.
pub const IDLE_FALLBACK_DELAY: Duration = Duration::from_millis(50);

/// Scheduling primitive consumed by the runtime.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// from any task. Spawned futures are detached: the scheduler never reports
/// their completion back.
pub trait Scheduler: Send + Sync {
    /// Run a task to completion in the background.
    fn spawn(&self, task: BoxFuture<'static, ()>);

    /// A future that resolves after `after` has elapsed.
    ///
    /// A zero delay still defers to the next scheduling tick; it never
    /// resolves inline.
    fn delay(&self, after: Duration) -> BoxFuture<'static, ()>;

    /// Run a task when the host is idle, falling back to a short delay.
    ///
    /// Used to warm caches without competing with user interaction. The
    /// default routes through [`Scheduler::delay`] with
    /// [`IDLE_FALLBACK_DELAY`].
    fn spawn_idle(&self, task: BoxFuture<'static, ()>) {
        let pause = self.delay(IDLE_FALLBACK_DELAY);
        self.spawn(Box::pin(async move {
            pause.await;
            task.await;
        }));
    }
}

/// Production scheduler backed by the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }

    fn delay(&self, after: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(after))
    }
}
