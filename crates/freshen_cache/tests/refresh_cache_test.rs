//! Tests for the blocking refreshing cache.

use freshen_cache::{CacheConfigBuilder, RefreshCache};
use std::cell::Cell;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
struct Mock {
    val: i32,
}

#[test]
fn test_empty_cache_runs_producer() {
    let cache: RefreshCache<Mock, String> = RefreshCache::new(Duration::from_secs(1));

    let got = cache.get(|| Ok(Mock { val: 123 }));
    assert_eq!(got, Ok(Mock { val: 123 }));
}

#[test]
fn test_fresh_record_ignores_new_producer() {
    let cache: RefreshCache<Mock, String> = RefreshCache::new(Duration::from_secs(1));

    assert_eq!(cache.get(|| Ok(Mock { val: 123 })).unwrap().val, 123);
    assert_eq!(cache.get(|| Ok(Mock { val: 456 })).unwrap().val, 123);
}

#[test]
fn test_expired_record_is_refreshed() {
    let cache: RefreshCache<Mock, String> = RefreshCache::new(Duration::from_secs(1));

    assert_eq!(cache.get(|| Ok(Mock { val: 123 })).unwrap().val, 123);
    assert_eq!(cache.get(|| Ok(Mock { val: 456 })).unwrap().val, 123);

    thread::sleep(Duration::from_millis(1100));
    assert_eq!(cache.get(|| Ok(Mock { val: 567 })).unwrap().val, 567);
}

#[test]
fn test_clear_forces_refresh() {
    let cache: RefreshCache<Mock, String> = RefreshCache::new(Duration::from_secs(1));

    assert_eq!(cache.get(|| Ok(Mock { val: 123 })).unwrap().val, 123);

    cache.clear();
    let got = cache.get(|| Ok(Mock::default())).unwrap();
    assert_eq!(got.val, 0);
}

#[test]
fn test_clear_does_not_shorten_later_windows() {
    let cache: RefreshCache<u32, String> = RefreshCache::new(Duration::from_secs(60));

    assert_eq!(cache.get(|| Ok(1)), Ok(1));
    cache.clear();
    assert_eq!(cache.get(|| Ok(2)), Ok(2));
    // The refresh after a clear gets the configured TTL back.
    assert_eq!(cache.get(|| Ok(3)), Ok(2));
    assert!(!cache.is_expired());
}

#[test]
fn test_clear_on_empty_cache_is_harmless() {
    let cache: RefreshCache<u32, String> = RefreshCache::new(Duration::from_secs(60));
    cache.clear();
    assert_eq!(cache.get(|| Ok(9)), Ok(9));
}

#[test]
fn test_error_is_cached_within_window() {
    let cache: RefreshCache<u32, String> = RefreshCache::new(Duration::from_millis(300));

    assert_eq!(cache.get(|| Err("upstream down".to_string())), Err("upstream down".to_string()));
    // A succeeding producer inside the window is never consulted.
    assert_eq!(cache.get(|| Ok(1)), Err("upstream down".to_string()));

    thread::sleep(Duration::from_millis(400));
    assert_eq!(cache.get(|| Ok(2)), Ok(2));
    assert_eq!(cache.get(|| Err("again".to_string())), Ok(2));
}

#[test]
fn test_for_testing_always_refreshes() {
    let cache: RefreshCache<u32, String> = RefreshCache::for_testing();
    let calls = Cell::new(0);

    for expected in 1..=5 {
        let got = cache.get(|| {
            calls.set(calls.get() + 1);
            Ok(expected)
        });
        assert_eq!(got, Ok(expected));
    }
    assert_eq!(calls.get(), 5);
    assert_eq!(cache.ttl(), Duration::ZERO);
}

#[test]
fn test_expiry_inspection() {
    let cache: RefreshCache<u32, String> = RefreshCache::new(Duration::from_secs(60));
    assert!(cache.is_expired());
    assert_eq!(cache.time_remaining(), None);

    cache.get(|| Ok(1)).unwrap();
    assert!(!cache.is_expired());
    let remaining = cache.time_remaining().unwrap();
    assert!(remaining <= Duration::from_secs(60));
    assert!(remaining > Duration::from_secs(50));

    cache.clear();
    assert!(cache.is_expired());
}

#[test]
fn test_from_config_uses_name_and_ttl() {
    let config = CacheConfigBuilder::default()
        .name("rates")
        .ttl_millis(250u64)
        .build()
        .unwrap();
    let cache: RefreshCache<u32, String> = RefreshCache::from_config(&config).unwrap();

    assert_eq!(cache.name(), "rates");
    assert_eq!(cache.ttl(), Duration::from_millis(250));
}

#[test]
fn test_metrics_track_hits_refreshes_and_clears() {
    let cache: RefreshCache<u32, String> = RefreshCache::new(Duration::from_secs(60));

    cache.get(|| Ok(1)).unwrap();
    cache.get(|| Ok(2)).unwrap();
    cache.get(|| Ok(3)).unwrap();
    cache.clear();
    let _ = cache.get(|| Err("nope".to_string()));

    let stats = cache.metrics().snapshot();
    assert_eq!(stats.refreshes, 2);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.waits, 0);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.clears, 1);
    assert_eq!(stats.abandoned, 0);
    assert!(stats.millis_since_refresh.is_some());
}

#[test]
fn test_debug_output_names_cache() {
    let cache: RefreshCache<u32, String> = RefreshCache::named("tokens", Duration::from_secs(5));
    let rendered = format!("{:?}", cache);
    assert!(rendered.contains("RefreshCache"));
    assert!(rendered.contains("tokens"));
}
