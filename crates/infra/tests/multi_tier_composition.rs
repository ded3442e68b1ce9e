//! Composition tests for the assembled tier stack.
//!
//! No live redis here: the interesting cases are the memory-only default
//! and the degraded two-tier stack where redis never came up.

use std::time::Duration;

use strata_domain::config::CacheSettings;
use strata_infra::build_cache;

fn init_tracing() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

/// Validates the default settings assemble a memory-only stack.
#[tokio::test]
async fn test_default_stack_is_memory_only() {
    let cache = build_cache(&CacheSettings::default()).await;

    assert_eq!(cache.tier_count(), 1);
    let stats = cache.statistics();
    assert!(stats.contains_key("memory"));
    assert!(!stats.contains_key("redis"));
}

/// Validates an unreachable redis still yields a two-tier stack that
/// serves reads and invalidations from memory.
///
/// Assertions:
/// - Confirms both tiers are present even though redis never connected.
/// - Confirms a write lands, a read hits, and pattern removal counts the
///   memory deletion while the disabled tier contributes zero.
#[tokio::test]
async fn test_unreachable_redis_degrades_to_memory() {
    init_tracing();
    let settings = CacheSettings {
        enable_distributed_cache: true,
        redis_url: "redis://127.0.0.1:1".to_owned(),
        operation_timeout_millis: 200,
        ..CacheSettings::default()
    };

    let cache = build_cache(&settings).await;
    assert_eq!(cache.tier_count(), 2);

    cache.set("strata:entity:Widget:w-1", b"payload", Duration::from_secs(60)).await.unwrap();
    assert_eq!(
        cache.get("strata:entity:Widget:w-1").await.as_deref(),
        Some(b"payload".as_slice())
    );

    let removed = cache.remove_by_pattern("strata:*:Widget:*").await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(cache.get("strata:entity:Widget:w-1").await, None);

    let stats = cache.statistics();
    assert!(stats.contains_key("memory"));
    assert!(stats.contains_key("redis"));
}

/// Validates `clear_all` succeeds across a degraded stack.
#[tokio::test]
async fn test_clear_all_with_disabled_redis() {
    let settings = CacheSettings {
        enable_distributed_cache: true,
        redis_url: "redis://127.0.0.1:1".to_owned(),
        operation_timeout_millis: 200,
        ..CacheSettings::default()
    };

    let cache = build_cache(&settings).await;
    cache.set("strata:stats:Widget:count", b"5", Duration::from_secs(60)).await.unwrap();

    assert!(cache.clear_all().await);
    assert_eq!(cache.get("strata:stats:Widget:count").await, None);
}
