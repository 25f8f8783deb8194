//! Cadence Metrics - Performance Monitor
//!
//! Records start/end timestamps of named operations into rolling
//! aggregates. Count, total, min, and max are exact and unbounded; a
//! bounded ring of the most recent raw durations backs percentile
//! estimation only. Measurement is cheap enough to wrap any operation:
//! one clock read at each edge and a map update, with optional
//! probabilistic sampling to thin the cost further.
//!
//! Monitors are explicitly constructed, injectable instances — there is no
//! process-wide registry. Tests construct isolated monitors with a manual
//! clock and assert exact durations.

pub mod aggregate;
pub mod config;
pub mod monitor;

pub use aggregate::MetricSummary;
pub use config::MonitorConfig;
pub use monitor::{CompletedMeasure, MeasureHandle, PerformanceMonitor};
