//! Observability snapshots. No side effects; reading stats never touches
//! entry recency or counters.

use std::time::Duration;

use serde::Serialize;

/// Point-in-time view of one live entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    pub key: String,
    /// Time until expiry; zero when already expired.
    pub remaining_ttl: Duration,
    pub expired: bool,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live entries in least-recently-set to most-recently-set order.
    pub entries: Vec<EntryStats>,
    /// Reads served synchronously from a fresh entry.
    pub hits: u64,
    /// Reads that had to fetch.
    pub misses: u64,
    /// Reads served an expired value under stale-while-revalidate.
    pub stale_hits: u64,
    /// Reads that joined an already in-flight fetch.
    pub coalesced: u64,
    /// Entries dropped by the least-recently-set policy.
    pub evictions: u64,
    /// Fetches currently in flight.
    pub in_flight: usize,
}

impl CacheStats {
    /// Fraction of reads that avoided a fetch (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
