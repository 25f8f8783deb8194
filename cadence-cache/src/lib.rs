//! Cadence Cache - Request Cache Manager
//!
//! Caches the result of an asynchronous fetch operation keyed by an opaque
//! string, with TTL expiry, stale-while-revalidate, request coalescing, and
//! bounded least-recently-set eviction.
//!
//! # Semantics
//!
//! - A read of a non-expired entry returns synchronously; it never waits on
//!   a fetch.
//! - For a fixed key, at most one fetch is logically in flight at a time:
//!   overlapping [`RequestCache::get`] calls observe the same eventual
//!   result through a pending-request registry of shared futures.
//! - Stale-while-revalidate serves an expired value immediately and starts
//!   at most one background refresh per key; refresh failures are logged
//!   and never surfaced, since the caller already received a value.
//! - A failed fetch falls back to a stale value when one exists; otherwise
//!   the failure propagates to the caller. There is no retry policy here —
//!   retry, if desired, belongs to the fetcher.
//!
//! The cache holds no business data and no durable state: everything is
//! ephemeral, in-memory, and scoped to one instance. Callers needing
//! isolation construct separate instances.

pub mod config;
pub mod fetch;
pub mod request_cache;
pub mod stats;

pub use config::{CacheConfig, GetOptions};
pub use fetch::Fetch;
pub use request_cache::{EvictCallback, RequestCache};
pub use stats::{CacheStats, EntryStats};
