//! Cadence Core - Shared Types and Capability Seams
//!
//! Foundation crate for the Cadence performance runtime. All other crates
//! depend on this. It contains the error taxonomy, common type aliases, and
//! the two capability traits ([`Clock`], [`Scheduler`]) through which every
//! component receives its time source and scheduling primitive.
//!
//! Components never reach for ambient time or a global executor: both
//! capabilities are injected explicitly so tests can substitute
//! deterministic implementations.

pub mod clock;
pub mod error;
pub mod scheduler;

pub use clock::{Clock, TokioClock};
pub use error::{CacheError, CadenceError, CadenceResult, ConfigError, FetchError};
pub use scheduler::{Scheduler, TokioScheduler};

use chrono::{DateTime, Utc};

/// Wall-clock timestamp for records that leave the process.
///
/// Interval math always uses the monotonic [`Clock`]; this alias exists only
/// for observability payloads (e.g. completed measurements).
pub type Timestamp = DateTime<Utc>;
