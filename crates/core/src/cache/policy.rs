use crate::config::CacheConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认生存时间：一小时
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// 默认条目上限
pub const DEFAULT_MAX_ENTRIES: usize = 5000;

/// # Summary
/// 超出条目上限时的淘汰策略。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvictionPolicy {
    // 只按生存时间过期，不限制条目数
    TtlOnly,
    // 超过上限时优先清理过期条目，再淘汰最久未访问的条目
    Lru { max_entries: usize },
}

/// # Summary
/// 缓存后端的过期与淘汰配置。
///
/// # Invariants
/// - `ttl` 从写入时刻开始计算，读取不会续期。
/// - 策略仅由缓存后端执行，调用方只观察到“存在/不存在”。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub eviction: EvictionPolicy,
}

impl CachePolicy {
    /// 使用 LRU 上限构造策略
    pub fn lru(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            eviction: EvictionPolicy::Lru { max_entries },
        }
    }

    /// 仅按生存时间过期的策略
    pub fn ttl_only(ttl: Duration) -> Self {
        Self {
            ttl,
            eviction: EvictionPolicy::TtlOnly,
        }
    }

    /// 条目上限，TtlOnly 时为 None
    pub fn max_entries(&self) -> Option<usize> {
        match self.eviction {
            EvictionPolicy::TtlOnly => None,
            EvictionPolicy::Lru { max_entries } => Some(max_entries),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::lru(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        match config.threshold {
            0 => Self::ttl_only(ttl),
            n => Self::lru(ttl, n),
        }
    }
}
