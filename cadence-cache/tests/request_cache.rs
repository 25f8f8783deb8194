//! Request cache behavior tests.
//!
//! These live as an integration test (rather than a `#[cfg(test)]` module in
//! the library) because they use `cadence_test_utils::MockFetcher`, whose
//! `Fetch` impl is only coherent against the single, non-test build of
//! `cadence-cache`. A cfg(test) unit module instead links a second, test-cfg
//! copy of the crate, against which that impl does not apply.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadence_cache::request_cache::RequestCache;
use cadence_cache::{CacheConfig, GetOptions};
use cadence_core::CacheError;
use regex::Regex;
    use cadence_test_utils::MockFetcher;
    use tokio::time::{advance, sleep};

    const TTL: Duration = Duration::from_millis(1000);

    fn cache() -> RequestCache<String> {
        RequestCache::new(CacheConfig::new().with_default_ttl(TTL)).expect("valid config")
    }

    fn small_cache(max_size: usize) -> RequestCache<String> {
        RequestCache::new(
            CacheConfig::new()
                .with_max_size(max_size)
                .with_default_ttl(TTL),
        )
        .expect("valid config")
    }

    /// Let spawned driver tasks run to settlement without advancing time.
    async fn drain() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_hit_does_not_refetch() {
        let cache = cache();
        let fetcher = MockFetcher::returning("A");

        assert_eq!(
            cache
                .get("k", fetcher.clone(), GetOptions::new())
                .await
                .unwrap(),
            "A"
        );
        drain().await;
        assert_eq!(
            cache
                .get("k", fetcher.clone(), GetOptions::new())
                .await
                .unwrap(),
            "A"
        );
        assert_eq!(fetcher.calls(), 1);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl_boundary() {
        let cache = cache();
        let fetcher = MockFetcher::sequence(["A", "B"]);

        cache
            .get("k", fetcher.clone(), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        advance(TTL).await;
        // A read at exactly t + ttl sees an expired entry.
        assert_eq!(
            cache
                .get("k", fetcher.clone(), GetOptions::new())
                .await
                .unwrap(),
            "B"
        );
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_reads_coalesce_into_one_fetch() {
        let cache = cache();
        let fetcher = MockFetcher::returning("A").with_latency(Duration::from_millis(50));

        let (a, b, c) = tokio::join!(
            cache.get("k", fetcher.clone(), GetOptions::new()),
            cache.get("k", fetcher.clone(), GetOptions::new()),
            cache.get("k", fetcher.clone(), GetOptions::new()),
        );
        assert_eq!(a.unwrap(), "A");
        assert_eq!(b.unwrap(), "A");
        assert_eq!(c.unwrap(), "A");
        assert_eq!(fetcher.calls(), 1);

        drain().await;
        let stats = cache.stats().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_while_revalidate_end_to_end() {
        let cache = cache();
        let fetcher =
            MockFetcher::sequence(["A", "B"]).with_latency(Duration::from_millis(50));
        let swr = GetOptions::new().with_stale_while_revalidate(true);

        // t=0: populate with "A".
        assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "A");
        drain().await;

        // t=1550: expired; stale "A" served immediately, refresh started.
        advance(Duration::from_millis(1500)).await;
        assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "A");
        assert_eq!(cache.stats().unwrap().in_flight, 1);

        // t=1650: refresh settled; fresh read sees "B".
        sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "B");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reads_trigger_exactly_one_refresh() {
        let cache = cache();
        let fetcher =
            MockFetcher::sequence(["A", "B"]).with_latency(Duration::from_millis(100));
        let swr = GetOptions::new().with_stale_while_revalidate(true);

        cache.get("k", fetcher.clone(), swr).await.unwrap();
        drain().await;
        advance(TTL * 2).await;

        // Many stale reads while the refresh is outstanding.
        for _ in 0..5 {
            assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "A");
        }
        assert_eq!(fetcher.calls(), 2);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "B");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_failure_keeps_stale_entry() {
        let cache = cache();
        let swr = GetOptions::new().with_stale_while_revalidate(true);

        cache
            .get("k", MockFetcher::returning("A"), swr)
            .await
            .unwrap();
        drain().await;
        advance(TTL * 2).await;

        let failing = MockFetcher::failing("backend down");
        assert_eq!(cache.get("k", failing.clone(), swr).await.unwrap(), "A");
        drain().await;

        // Entry still present and still stale; no error surfaced anywhere.
        assert_eq!(cache.get("k", failing, swr).await.unwrap(), "A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_without_stale_value_propagates() {
        let cache = cache();
        let fetcher = MockFetcher::<String>::failing("offline");

        let err = cache
            .get("k", fetcher, GetOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            cadence_core::CadenceError::Cache(CacheError::FetchFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_with_stale_value_degrades_gracefully() {
        let cache = cache();

        cache
            .get("k", MockFetcher::returning("A"), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        advance(TTL * 2).await;

        // Expired, no stale-while-revalidate: a real fetch runs and fails,
        // but the stale value rescues the read.
        assert_eq!(
            cache
                .get("k", MockFetcher::failing("backend down"), GetOptions::new())
                .await
                .unwrap(),
            "A"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_least_recently_set_eviction() {
        let cache = small_cache(2);
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        cache
            .set_evict_callback(Arc::new(move |key, _value: &String| {
                sink.lock().unwrap().push(key.to_string());
            }))
            .unwrap();

        for key in ["k1", "k2", "k3"] {
            cache
                .get(key, MockFetcher::returning("v"), GetOptions::new())
                .await
                .unwrap();
            drain().await;
        }

        assert_eq!(*evicted.lock().unwrap(), vec!["k1".to_string()]);
        let stats = cache.stats().unwrap();
        assert_eq!(stats.evictions, 1);
        let keys: Vec<_> = stats.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["k2", "k3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setting_existing_key_refreshes_recency() {
        let cache = small_cache(2);

        cache
            .get("k1", MockFetcher::returning("v"), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        cache
            .get("k2", MockFetcher::returning("v"), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        // Re-set k1: now k2 is least-recently-set.
        cache
            .get(
                "k1",
                MockFetcher::returning("v"),
                GetOptions::new().with_force_refresh(true),
            )
            .await
            .unwrap();
        drain().await;
        cache
            .get("k3", MockFetcher::returning("v"), GetOptions::new())
            .await
            .unwrap();
        drain().await;

        let stats = cache.stats().unwrap();
        let keys: Vec<_> = stats.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_refresh_bypasses_live_entry() {
        let cache = cache();
        let fetcher = MockFetcher::sequence(["A", "B"]);

        cache
            .get("k", fetcher.clone(), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        assert_eq!(
            cache
                .get(
                    "k",
                    fetcher.clone(),
                    GetOptions::new().with_force_refresh(true)
                )
                .await
                .unwrap(),
            "B"
        );
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let cache = cache();
        let fetcher = MockFetcher::sequence(["A", "B"]);

        cache
            .get("k", fetcher.clone(), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        cache.invalidate("k").unwrap();
        assert_eq!(
            cache
                .get("k", fetcher.clone(), GetOptions::new())
                .await
                .unwrap(),
            "B"
        );
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_pattern_removes_matching_keys() {
        let cache = cache();
        for key in ["user:1", "user:2", "account:1"] {
            cache
                .get(key, MockFetcher::returning("v"), GetOptions::new())
                .await
                .unwrap();
            drain().await;
        }

        let removed = cache
            .invalidate_pattern(&Regex::new("^user:").unwrap())
            .unwrap();
        assert_eq!(removed, 2);

        let stats = cache.stats().unwrap();
        let keys: Vec<_> = stats.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["account:1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_everything() {
        let cache = cache();
        cache
            .get("k", MockFetcher::returning("v"), GetOptions::new())
            .await
            .unwrap();
        drain().await;
        cache.clear().unwrap();
        let stats = cache.stats().unwrap();
        assert!(stats.entries.is_empty());
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidation_outliving_invalidate_repopulates() {
        // Documented staleness window: an in-flight revalidation is not
        // suppressed by invalidate and repopulates the entry on settlement.
        let cache = cache();
        let fetcher =
            MockFetcher::sequence(["A", "B"]).with_latency(Duration::from_millis(100));
        let swr = GetOptions::new().with_stale_while_revalidate(true);

        cache.get("k", fetcher.clone(), swr).await.unwrap();
        drain().await;
        advance(TTL * 2).await;

        assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "A");
        cache.invalidate("k").unwrap();
        sleep(Duration::from_millis(200)).await;

        // The refresh settled after the invalidation and stored "B".
        assert_eq!(cache.get("k", fetcher.clone(), swr).await.unwrap(), "B");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_report_remaining_ttl_and_expiry() {
        let cache = cache();
        cache
            .get("k", MockFetcher::returning("v"), GetOptions::new())
            .await
            .unwrap();
        drain().await;

        advance(Duration::from_millis(400)).await;
        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries.len(), 1);
        assert!(!stats.entries[0].expired);
        assert_eq!(stats.entries[0].remaining_ttl, Duration::from_millis(600));

        advance(Duration::from_millis(700)).await;
        let stats = cache.stats().unwrap();
        assert!(stats.entries[0].expired);
        assert_eq!(stats.entries[0].remaining_ttl, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_populates_during_idle_time() {
        let cache = cache();
        let fetcher = MockFetcher::returning("A");

        cache.warm("k", fetcher.clone(), TTL);
        assert_eq!(fetcher.calls(), 0);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(fetcher.calls(), 1);

        // Key already live: a second warm is a no-op.
        cache.warm("k", fetcher.clone(), TTL);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(fetcher.calls(), 1);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_failure_observed_by_all_waiters() {
        let cache = cache();
        let fetcher =
            MockFetcher::<String>::failing("offline").with_latency(Duration::from_millis(50));

        let (a, b) = tokio::join!(
            cache.get("k", fetcher.clone(), GetOptions::new()),
            cache.get("k", fetcher.clone(), GetOptions::new()),
        );
        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(fetcher.calls(), 1);
    }
