//! Monotonic clock capability.
//!
//! Every component that does interval math reads time through [`Clock`]
//! rather than calling `Instant::now()` directly. The production
//! implementation delegates to the tokio clock, which means tests running
//! under a paused runtime observe virtual time with no further wiring.

use std::fmt;
use std::time::Instant;

/// Monotonic time source.
///
/// Implementations must be monotonic: successive `now()` calls never go
/// backwards. Wall-clock time is out of scope here; see
/// [`crate::Timestamp`] for records that leave the process.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by the tokio runtime clock.
///
/// Reads `tokio::time::Instant` and converts to `std::time::Instant`, so a
/// runtime started with `start_paused = true` drives this clock through
/// `tokio::time::advance` like any other timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
