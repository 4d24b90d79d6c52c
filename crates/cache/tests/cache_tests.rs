use chrono::{Duration as TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use stocker_cache::fs::FileCache;
use stocker_cache::mem::MemCache;
use stocker_core::cache::error::CacheError;
use stocker_core::cache::policy::CachePolicy;
use stocker_core::cache::port::{Cache, CacheExt};
use stocker_core::common::time::FakeClockProvider;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct TestItem {
    id: u32,
    name: String,
}

fn fake_clock() -> Arc<FakeClockProvider> {
    Arc::new(FakeClockProvider::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
    ))
}

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn test_mem_cache_raw_ops() {
    let cache = MemCache::new();
    let key = "raw_key";
    let value = vec![1, 2, 3, 4];

    cache.set_raw(key, value.clone()).await.unwrap();
    assert_eq!(cache.get_raw(key).await.unwrap(), Some(value));
    assert_eq!(cache.len().await.unwrap(), 1);

    cache.del(key).await.unwrap();
    assert!(cache.get_raw(key).await.unwrap().is_none());
    // 删除不存在的键不报错
    cache.del(key).await.unwrap();
}

#[tokio::test]
async fn test_mem_cache_typed_ops() {
    let cache = MemCache::new();
    let item = TestItem {
        id: 42,
        name: "AAPL".to_string(),
    };

    cache.set("typed_key", &item).await.unwrap();
    let result: TestItem = cache.get("typed_key").await.unwrap().unwrap();
    assert_eq!(result, item);
}

#[tokio::test]
async fn test_corrupt_payload_is_deserialize_error() {
    let cache = MemCache::new();
    cache.set_raw("bad", b"not json".to_vec()).await.unwrap();
    let err = cache.get::<TestItem>("bad").await.unwrap_err();
    assert!(matches!(err, CacheError::Deserialize(_)));
}

#[tokio::test]
async fn test_mem_cache_overwrite_replaces_value() {
    let cache = MemCache::new();
    cache.set_raw("k", vec![1]).await.unwrap();
    cache.set_raw("k", vec![2]).await.unwrap();
    assert_eq!(cache.get_raw("k").await.unwrap(), Some(vec![2]));
    assert_eq!(cache.len().await.unwrap(), 1);
}

/// # Summary
/// 生存时间从写入时刻起算，到期后读取视为不存在。
#[tokio::test]
async fn test_mem_cache_ttl_expiry() {
    let clock = fake_clock();
    let cache = MemCache::with_clock(CachePolicy::lru(HOUR, 10), clock.clone());
    cache.set_raw("k", vec![7]).await.unwrap();

    clock.advance(TimeDelta::minutes(59));
    assert_eq!(cache.get_raw("k").await.unwrap(), Some(vec![7]));

    clock.advance(TimeDelta::minutes(1));
    assert!(cache.get_raw("k").await.unwrap().is_none());
    assert_eq!(cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_mem_cache_rewrite_resets_ttl() {
    let clock = fake_clock();
    let cache = MemCache::with_clock(CachePolicy::ttl_only(HOUR), clock.clone());
    cache.set_raw("k", vec![1]).await.unwrap();
    clock.advance(TimeDelta::minutes(50));
    cache.set_raw("k", vec![2]).await.unwrap();
    clock.advance(TimeDelta::minutes(50));
    assert_eq!(cache.get_raw("k").await.unwrap(), Some(vec![2]));
}

/// # Summary
/// 超出上限时淘汰最久未访问的条目。
#[tokio::test]
async fn test_mem_cache_lru_eviction() {
    let cache = MemCache::with_clock(CachePolicy::lru(HOUR, 2), fake_clock());
    cache.set_raw("a", vec![1]).await.unwrap();
    cache.set_raw("b", vec![2]).await.unwrap();
    // 访问 a 使 b 成为最久未访问
    cache.get_raw("a").await.unwrap();
    cache.set_raw("c", vec![3]).await.unwrap();

    assert_eq!(cache.len().await.unwrap(), 2);
    assert!(cache.get_raw("a").await.unwrap().is_some());
    assert!(cache.get_raw("b").await.unwrap().is_none());
    assert!(cache.get_raw("c").await.unwrap().is_some());
}

#[tokio::test]
async fn test_mem_cache_eviction_prefers_expired_entries() {
    let clock = fake_clock();
    let cache = MemCache::with_clock(CachePolicy::lru(HOUR, 2), clock.clone());
    cache.set_raw("old", vec![1]).await.unwrap();
    clock.advance(TimeDelta::minutes(30));
    cache.set_raw("a", vec![2]).await.unwrap();
    cache.get_raw("old").await.unwrap();
    clock.advance(TimeDelta::minutes(31));
    // old 已过期，即使最近被访问也应先被清理
    cache.set_raw("b", vec![3]).await.unwrap();

    assert_eq!(cache.len().await.unwrap(), 2);
    assert!(cache.get_raw("a").await.unwrap().is_some());
    assert!(cache.get_raw("b").await.unwrap().is_some());
}

#[tokio::test]
async fn test_mem_cache_ttl_only_is_unbounded() {
    let cache = MemCache::with_policy(CachePolicy::ttl_only(HOUR));
    for i in 0..50u8 {
        cache.set_raw(&format!("k{}", i), vec![i]).await.unwrap();
    }
    assert_eq!(cache.len().await.unwrap(), 50);
}

#[tokio::test]
async fn test_mem_cache_concurrent_writers() {
    let cache = Arc::new(MemCache::new());
    let handles: Vec<_> = (0..16u8)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.set_raw(&format!("k{}", i), vec![i]).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(cache.len().await.unwrap(), 16);
}

#[tokio::test]
async fn test_file_cache_raw_and_typed_ops() {
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path(), CachePolicy::default()).unwrap();

    cache.set_raw("stock_data_AAPL", vec![9, 8, 7]).await.unwrap();
    assert_eq!(cache.get_raw("stock_data_AAPL").await.unwrap(), Some(vec![9, 8, 7]));

    let item = TestItem {
        id: 1,
        name: "MSFT".into(),
    };
    cache.set("stock_data_MSFT", &item).await.unwrap();
    assert_eq!(cache.get::<TestItem>("stock_data_MSFT").await.unwrap(), Some(item));
    assert_eq!(cache.len().await.unwrap(), 2);

    cache.del("stock_data_AAPL").await.unwrap();
    cache.del("stock_data_AAPL").await.unwrap();
    assert!(cache.get_raw("stock_data_AAPL").await.unwrap().is_none());
    assert_eq!(cache.len().await.unwrap(), 1);
}

/// # Summary
/// 文件缓存在新实例（模拟进程重启）中仍可读取。
#[tokio::test]
async fn test_file_cache_survives_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = FileCache::new(dir.path(), CachePolicy::default()).unwrap();
        cache.set_raw("k", b"payload".to_vec()).await.unwrap();
    }
    let reopened = FileCache::new(dir.path(), CachePolicy::default()).unwrap();
    assert_eq!(reopened.get_raw("k").await.unwrap(), Some(b"payload".to_vec()));
}

#[tokio::test]
async fn test_file_cache_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("cache-directory");
    let cache = FileCache::new(&nested, CachePolicy::default()).unwrap();
    assert!(nested.is_dir());
    assert_eq!(cache.dir(), nested.as_path());
    assert_eq!(cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_cache_ttl_expiry_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let clock = fake_clock();
    let cache = FileCache::with_clock(dir.path(), CachePolicy::lru(HOUR, 10), clock.clone()).unwrap();
    cache.set_raw("k", vec![1]).await.unwrap();

    clock.advance(TimeDelta::minutes(59));
    assert!(cache.get_raw("k").await.unwrap().is_some());

    clock.advance(TimeDelta::minutes(2));
    assert!(cache.get_raw("k").await.unwrap().is_none());
    assert_eq!(cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_cache_prunes_oldest_writes() {
    let dir = tempfile::tempdir().unwrap();
    let clock = fake_clock();
    let cache = FileCache::with_clock(dir.path(), CachePolicy::lru(HOUR, 2), clock.clone()).unwrap();
    for key in ["a", "b", "c"] {
        cache.set_raw(key, key.as_bytes().to_vec()).await.unwrap();
        clock.advance(TimeDelta::seconds(1));
    }

    assert_eq!(cache.len().await.unwrap(), 2);
    assert!(cache.get_raw("a").await.unwrap().is_none());
    assert!(cache.get_raw("b").await.unwrap().is_some());
    assert!(cache.get_raw("c").await.unwrap().is_some());
}

#[tokio::test]
async fn test_file_cache_discards_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path(), CachePolicy::default()).unwrap();
    cache.set_raw("k", vec![1, 2, 3]).await.unwrap();

    let mut entries = std::fs::read_dir(dir.path()).unwrap();
    let path = entries.next().unwrap().unwrap().path();
    std::fs::write(&path, [0u8; 3]).unwrap();

    assert!(cache.get_raw("k").await.unwrap().is_none());
    assert!(!path.exists());
}
