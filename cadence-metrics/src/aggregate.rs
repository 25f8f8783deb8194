//! Rolling aggregates and percentile estimation.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Exact totals plus a bounded ring of recent samples.
///
/// Count, total, min, and max cover every recorded duration. The ring only
/// feeds percentile estimation; once it is full the oldest sample is
/// silently dropped.
#[derive(Debug, Clone)]
pub(crate) struct MetricAggregate {
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
    samples: VecDeque<Duration>,
}

impl MetricAggregate {
    pub(crate) fn new() -> Self {
        Self {
            count: 0,
            total: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
            samples: VecDeque::new(),
        }
    }

    pub(crate) fn record(&mut self, duration: Duration, max_samples: usize) {
        self.count += 1;
        self.total += duration;
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
        if self.samples.len() >= max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    pub(crate) fn summary(&self, name: &str) -> MetricSummary {
        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let avg = if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        };
        MetricSummary {
            name: name.to_string(),
            count: self.count,
            avg,
            min: if self.count == 0 { Duration::ZERO } else { self.min },
            max: self.max,
            p50: percentile(&sorted, 50),
            p95: percentile(&sorted, 95),
            p99: percentile(&sorted, 99),
        }
    }
}

/// Point-in-time summary of one metric.
///
/// Percentiles are estimated from the recent-sample ring; the other fields
/// are exact over the metric's whole history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub count: u64,
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    sorted[(sorted.len() * pct / 100).min(sorted.len() - 1)]
}
