//! Cadence Test Utilities
//!
//! Centralized test infrastructure for the Cadence workspace:
//! - [`ManualClock`]: a monotonic clock advanced explicitly by the test
//! - [`MockFetcher`]: a scripted fetcher with call counting and optional
//!   per-call latency
//!
//! Timer-driven behavior is tested against the production
//! `TokioClock`/`TokioScheduler` under `#[tokio::test(start_paused = true)]`;
//! `ManualClock` covers the components that read time without sleeping.

// Re-export core types for convenience
pub use cadence_core::{
    CacheError, CadenceError, CadenceResult, Clock, ConfigError, FetchError, Scheduler,
    TokioClock, TokioScheduler,
};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cadence_cache::Fetch;

// ============================================================================
// MANUAL CLOCK
// ============================================================================

/// Monotonic clock advanced explicitly by the test.
///
/// Clones share the same offset, so a clock handed to a component and the
/// handle kept by the test observe the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        *self.offset.lock().unwrap() += step;
    }

    /// Time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }
}

// ============================================================================
// MOCK FETCHER
// ============================================================================

struct MockFetcherInner<V> {
    /// Scripted responses; the final response repeats once the script is
    /// exhausted.
    responses: Mutex<VecDeque<Result<V, FetchError>>>,
    calls: AtomicUsize,
}

/// Scripted fetcher for cache tests.
///
/// Clones share the same script and call counter, so the handle kept by a
/// test observes fetches performed through the clone handed to the cache.
pub struct MockFetcher<V> {
    inner: Arc<MockFetcherInner<V>>,
    latency: Option<Duration>,
}

impl<V> Clone for MockFetcher<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            latency: self.latency,
        }
    }
}

impl<V: Clone + Send + 'static> MockFetcher<V> {
    fn with_script(responses: VecDeque<Result<V, FetchError>>) -> Self {
        Self {
            inner: Arc::new(MockFetcherInner {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }),
            latency: None,
        }
    }

    /// Every fetch succeeds with a clone of `value`.
    pub fn returning(value: impl Into<V>) -> Self {
        Self::with_script(VecDeque::from([Ok(value.into())]))
    }

    /// Fetches succeed with the given values in order; the last repeats.
    pub fn sequence<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<V>,
    {
        Self::with_script(values.into_iter().map(|v| Ok(v.into())).collect())
    }

    /// Every fetch fails with the given reason.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_script(VecDeque::from([Err(FetchError::new(reason))]))
    }

    /// Delay each fetch by `latency` before settling.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of fetches performed, across all clones.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<V, FetchError> {
        let mut responses = self.inner.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap_or_else(|| unreachable!())
        } else {
            responses
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchError::new("mock fetcher script is empty")))
        }
    }
}

#[async_trait]
impl<V: Clone + Send + 'static> Fetch<V> for MockFetcher<V> {
    async fn fetch(&self) -> Result<V, FetchError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_response()
    }
}
