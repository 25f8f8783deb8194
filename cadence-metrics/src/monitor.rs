//! The performance monitor.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cadence_core::{CadenceResult, Clock, Timestamp, TokioClock};
use chrono::Utc;
use serde::Serialize;

use crate::aggregate::{MetricAggregate, MetricSummary};
use crate::config::MonitorConfig;

/// In-progress measurement. Plain data: dropping it without calling
/// [`PerformanceMonitor::end_measure`] records nothing.
#[derive(Debug, Clone)]
pub struct MeasureHandle {
    pub name: String,
    pub started_at: Instant,
}

/// Record of one finished measurement.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedMeasure {
    pub name: String,
    pub duration: Duration,
    pub timestamp: Timestamp,
}

struct MonitorState {
    aggregates: HashMap<String, MetricAggregate>,
    /// Insertion order of metric names; the front is evicted first once
    /// the distinct-name ceiling is reached.
    order: VecDeque<String>,
}

struct MonitorShared {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<MonitorState>,
}

/// Latency monitor over named operations.
///
/// Cloning yields another handle to the same aggregates.
#[derive(Clone)]
pub struct PerformanceMonitor {
    shared: Arc<MonitorShared>,
}

impl PerformanceMonitor {
    /// Create a monitor with the production clock.
    pub fn new(config: MonitorConfig) -> CadenceResult<Self> {
        Self::with_capabilities(config, Arc::new(TokioClock::new()))
    }

    /// Create a monitor with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MonitorConfig::default())
            .unwrap_or_else(|_| unreachable!("default config is valid"))
    }

    /// Create a monitor with an explicit clock.
    pub fn with_capabilities(config: MonitorConfig, clock: Arc<dyn Clock>) -> CadenceResult<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(MonitorShared {
                config,
                clock,
                state: Mutex::new(MonitorState {
                    aggregates: HashMap::new(),
                    order: VecDeque::new(),
                }),
            }),
        })
    }

    /// Begin measuring `name`. Returns `None` when sampling skips this
    /// call.
    pub fn start_measure(&self, name: &str) -> Option<MeasureHandle> {
        let sample_rate = self.shared.config.sample_rate;
        if sample_rate < 1.0 && rand::random::<f64>() >= sample_rate {
            return None;
        }
        Some(MeasureHandle {
            name: name.to_string(),
            started_at: self.shared.clock.now(),
        })
    }

    /// Finish a measurement: fold the elapsed duration into the named
    /// aggregate and return the completed record.
    pub fn end_measure(&self, handle: MeasureHandle) -> CompletedMeasure {
        let duration = self.shared.clock.now().duration_since(handle.started_at);
        self.record(&handle.name, duration);
        CompletedMeasure {
            name: handle.name,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Measure an asynchronous operation. The duration is recorded on both
    /// the success and the failure path; a failure is re-propagated after
    /// recording.
    pub async fn measure_async<T, E, F>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let handle = self.start_measure(name);
        let result = operation.await;
        if let Some(handle) = handle {
            self.end_measure(handle);
        }
        result
    }

    /// Summary for one metric, or `None` if nothing was recorded under
    /// that name.
    pub fn metrics(&self, name: &str) -> Option<MetricSummary> {
        let state = self.lock_state();
        state.aggregates.get(name).map(|a| a.summary(name))
    }

    /// Summaries for every tracked metric, in insertion order.
    pub fn all_metrics(&self) -> Vec<MetricSummary> {
        let state = self.lock_state();
        state
            .order
            .iter()
            .filter_map(|name| state.aggregates.get(name).map(|a| a.summary(name)))
            .collect()
    }

    /// Emit one log line per tracked metric.
    pub fn log_report(&self) {
        for summary in self.all_metrics() {
            tracing::info!(
                metric = %summary.name,
                count = summary.count,
                avg_ms = as_millis(summary.avg),
                min_ms = as_millis(summary.min),
                max_ms = as_millis(summary.max),
                p50_ms = as_millis(summary.p50),
                p95_ms = as_millis(summary.p95),
                p99_ms = as_millis(summary.p99),
                "metric report"
            );
        }
    }

    fn record(&self, name: &str, duration: Duration) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if !state.aggregates.contains_key(name) {
            if state.order.len() >= self.shared.config.max_metrics {
                if let Some(victim) = state.order.pop_front() {
                    state.aggregates.remove(&victim);
                    tracing::debug!(metric = %victim, "evicting oldest metric aggregate");
                }
            }
            state.order.push_back(name.to_string());
            state.aggregates.insert(name.to_string(), MetricAggregate::new());
        }
        if let Some(aggregate) = state.aggregates.get_mut(name) {
            aggregate.record(duration, self.shared.config.max_samples);
        }
    }

    /// Aggregates stay consistent between lock sections; recover a
    /// poisoned lock rather than losing the measurement.
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
