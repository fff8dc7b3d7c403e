//! Property-based tests for user snapshot expiry

use proptest::prelude::*;
use std::time::Duration;

use roster::adapters::cache::UserCachePolicy;
use roster::CacheConfig;

proptest! {
    /// Every drawn TTL stays within `[base, base + jitter]`
    #[test]
    fn prop_ttl_within_jitter_window(base_ms in 1u64..86_400_000, jitter_ms in 0u64..3_600_000) {
        let base = Duration::from_millis(base_ms);
        let jitter = Duration::from_millis(jitter_ms);
        let policy = UserCachePolicy::new(base, jitter);

        for _ in 0..32 {
            let ttl = policy.snapshot_ttl();
            prop_assert!(ttl >= base, "ttl {:?} below base {:?}", ttl, base);
            prop_assert!(ttl <= base + jitter, "ttl {:?} above {:?}", ttl, base + jitter);
        }
    }

    /// With a non-trivial window, draws are spread rather than pinned
    #[test]
    fn prop_ttls_vary(base_ms in 1u64..86_400_000, jitter_ms in 1_000u64..3_600_000) {
        let policy = UserCachePolicy::new(Duration::from_millis(base_ms), Duration::from_millis(jitter_ms));
        let first = policy.snapshot_ttl();
        let varied = (0..64).any(|_| policy.snapshot_ttl() != first);
        prop_assert!(varied);
    }
}

#[test]
fn test_policy_follows_cache_config() {
    let config = CacheConfig::default();
    let policy = UserCachePolicy::from(&config);
    assert_eq!(policy.base_ttl, config.user_ttl());
    assert_eq!(policy.jitter, config.user_ttl_jitter());
}
