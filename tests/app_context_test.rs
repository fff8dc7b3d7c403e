//! End-to-end tests over the application wiring with a file database.

mod common;

use futures::future::join_all;
use std::collections::HashSet;
use tempfile::TempDir;

use roster::domain::models::{CacheBackend, ChangeType, Page, ProfilePatch};
use roster::infrastructure::setup::{build_context, AppContext};
use roster::Config;

async fn context(backend: CacheBackend) -> (TempDir, AppContext) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.database.path = dir.path().join("data").join("roster.db").display().to_string();
    config.cache.backend = backend;
    let ctx = build_context(&config).await.expect("Failed to build context");
    (dir, ctx)
}

#[tokio::test]
async fn test_concurrent_adds_get_distinct_versions() {
    common::setup_test_logging();
    let (_dir, ctx) = context(CacheBackend::Memory).await;
    assert_eq!(ctx.cache_backend, "memory");

    let owner = ctx.users.register("13800000000", "owner", None).await.unwrap();
    let mut peers = Vec::new();
    for i in 1..=8 {
        peers.push(ctx.users.register(&format!("1380000000{i}"), &format!("peer{i}"), None).await.unwrap());
    }

    let adds = peers.iter().map(|p| ctx.friends.add_friend(&owner.uuid, &p.uuid, "contacts"));
    for result in join_all(adds).await {
        result.unwrap();
    }

    let page = ctx.friends.sync(&owner.uuid, "0", 100).await.unwrap();
    assert_eq!(page.changes.len(), 8);
    assert!(page.changes.iter().all(|c| c.change_type == ChangeType::Added));

    let versions: Vec<i64> = page.changes.iter().map(|c| c.relation.version()).collect();
    let distinct: HashSet<i64> = versions.iter().copied().collect();
    assert_eq!(distinct.len(), versions.len());
    assert!(versions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(page.latest_version, *versions.last().unwrap());
}

#[tokio::test]
async fn test_profile_edits_visible_through_every_lookup() {
    let (_dir, ctx) = context(CacheBackend::Memory).await;

    let user = ctx.users.register("13800000100", "before", Some("b@example.com")).await.unwrap();
    // Warm both the snapshot and the phone index
    ctx.users.get_profile(&user.uuid).await.unwrap();
    ctx.users.get_by_phone("13800000100").await.unwrap();

    let patch = ProfilePatch {
        nickname: Some("after".to_string()),
        ..Default::default()
    };
    ctx.users.update_profile(&user.uuid, patch).await.unwrap();
    ctx.users.change_phone(&user.uuid, "13900000100").await.unwrap();

    assert_eq!(ctx.users.get_profile(&user.uuid).await.unwrap().nickname, "after");
    let by_phone = ctx.users.get_by_phone("13900000100").await.unwrap();
    assert_eq!(by_phone.uuid, user.uuid);
    assert_eq!(by_phone.nickname, "after");
    assert!(ctx.users.get_by_phone("13800000100").await.unwrap_err().is_not_found());

    let batch = ctx.users.batch_get(&[user.uuid.clone()]).await.unwrap();
    assert_eq!(batch[0].telephone, "13900000100");
}

#[tokio::test]
async fn test_store_alone_serves_everything_without_a_cache() {
    let (_dir, ctx) = context(CacheBackend::None).await;
    assert_eq!(ctx.cache_backend, "none");

    let a = ctx.users.register("13800000200", "a", None).await.unwrap();
    let b = ctx.users.register("13800000201", "b", None).await.unwrap();
    ctx.friends.add_friend(&a.uuid, &b.uuid, "").await.unwrap();
    ctx.friends.set_group_tag(&a.uuid, &b.uuid, "work").await.unwrap();

    let (friends, total) = ctx.friends.list_friends(&a.uuid, Some("work"), Page::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(friends[0].peer_uuid, b.uuid);
    assert_eq!(ctx.friends.list_tags(&a.uuid).await.unwrap(), vec!["work"]);
}
