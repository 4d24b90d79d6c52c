use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stocker_core::cache::error::CacheError;
use stocker_core::cache::policy::{CachePolicy, EvictionPolicy};
use stocker_core::cache::port::Cache;
use stocker_core::common::time::{RealTimeProvider, TimeProvider};
use tracing::debug;

/// 单个缓存条目
struct Entry {
    // 原始载荷
    value: Vec<u8>,
    // 写入时刻，用于判定过期
    stored_at: DateTime<Utc>,
    // 最近访问序号，越小越久未访问
    last_access: u64,
}

/// # Summary
/// 基于 DashMap 的进程内缓存实现，支持生存时间与 LRU 淘汰。
///
/// # Invariants
/// - 所有操作均通过并发哈希表 `DashMap` 执行，单键写入为原子替换。
/// - 过期条目读取时视为不存在并被惰性移除。
/// - 条目数超过上限时先清理过期条目，再按最近访问顺序淘汰。
pub struct MemCache {
    // 线程安全的 KV 存储容器
    storage: DashMap<String, Entry>,
    // 过期与淘汰策略
    policy: CachePolicy,
    ttl: TimeDelta,
    // 时钟，测试中可替换为虚拟时钟
    clock: Arc<dyn TimeProvider>,
    // 单调递增的访问序号
    access_seq: AtomicU64,
}

impl MemCache {
    /// # Summary
    /// 使用默认策略（1 小时、5000 条）创建缓存。
    pub fn new() -> Self {
        Self::with_policy(CachePolicy::default())
    }

    /// 使用指定策略与系统时钟创建缓存
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(RealTimeProvider))
    }

    /// # Summary
    /// 使用指定策略与时钟创建缓存。
    ///
    /// # Arguments
    /// * `policy`: 过期与淘汰策略。
    /// * `clock`: 时间供给器。
    ///
    /// # Returns
    /// 初始化的缓存实例。
    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            storage: DashMap::new(),
            ttl: TimeDelta::from_std(policy.ttl).unwrap_or(TimeDelta::MAX),
            policy,
            clock,
            access_seq: AtomicU64::new(0),
        }
    }

    fn next_access(&self) -> u64 {
        self.access_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) >= self.ttl
    }

    /// # Summary
    /// 超出条目上限时执行淘汰。
    ///
    /// # Logic
    /// 1. 移除所有过期条目。
    /// 2. 仍超出上限时，按最近访问序号从小到大移除多余条目。
    fn enforce_capacity(&self) {
        let EvictionPolicy::Lru { max_entries } = self.policy.eviction else {
            return;
        };
        if self.storage.len() <= max_entries {
            return;
        }

        let now = self.clock.now();
        self.storage.retain(|_, entry| !self.is_expired(entry, now));

        let overflow = self.storage.len().saturating_sub(max_entries);
        if overflow == 0 {
            return;
        }
        let mut by_access: Vec<(u64, String)> = self
            .storage
            .iter()
            .map(|e| (e.value().last_access, e.key().clone()))
            .collect();
        by_access.sort_unstable();
        for (_, key) in by_access.into_iter().take(overflow) {
            debug!(key = %key, "Evicting least recently used cache entry");
            self.storage.remove(&key);
        }
    }
}

impl Default for MemCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemCache {
    /// # Summary
    /// 写入原始字节数据。
    ///
    /// # Logic
    /// 1. 以当前时间作为写入时刻插入条目，同名键整体覆盖。
    /// 2. 按策略检查容量并淘汰。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            stored_at: self.clock.now(),
            last_access: self.next_access(),
        };
        self.storage.insert(key.to_string(), entry);
        self.enforce_capacity();
        Ok(())
    }

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Logic
    /// 1. 条目存在且未过期时刷新访问序号并返回克隆。
    /// 2. 条目已过期时移除并返回 None。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = self.clock.now();
        match self.storage.get_mut(key) {
            None => return Ok(None),
            Some(mut entry) => {
                if !self.is_expired(&entry, now) {
                    entry.last_access = self.next_access();
                    return Ok(Some(entry.value.clone()));
                }
            }
        }
        self.storage
            .remove_if(key, |_, entry| self.is_expired(entry, now));
        debug!(key, "Cache entry expired");
        Ok(None)
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.storage.len())
    }
}
