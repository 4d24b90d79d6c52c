use std::sync::Arc;
use stocker_core::cache::error::CacheError;
use stocker_core::cache::port::{Cache, CacheExt};
use stocker_core::market::frame::SeriesFrame;
use tracing::debug;

/// 缓存键前缀，完整键为 `stock_data_{TICKER}`
pub const KEY_PREFIX: &str = "stock_data_";

/// 由证券代码生成缓存键
pub fn cache_key(ticker: &str) -> String {
    format!("{}{}", KEY_PREFIX, ticker)
}

/// # Summary
/// 已计算指标序列的类型化缓存视图。
///
/// # Invariants
/// - 只存放完整计算过指标的序列，不存在只含部分指标的条目。
/// - 过期与淘汰由底层 `Cache` 实现决定，调用方只观察到存在或不存在。
#[derive(Clone)]
pub struct SeriesStore {
    cache: Arc<dyn Cache>,
}

impl SeriesStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// # Summary
    /// 读取某代码的缓存序列。
    ///
    /// # Returns
    /// 命中返回完整序列；未命中或已过期返回 None；载荷损坏返回 `CacheError::Deserialize`。
    pub async fn get(&self, ticker: &str) -> Result<Option<SeriesFrame>, CacheError> {
        let frame: Option<SeriesFrame> = self.cache.get(&cache_key(ticker)).await?;
        debug!(ticker, hit = frame.is_some(), "Series store lookup");
        Ok(frame)
    }

    /// 整体覆盖写入某代码的序列
    pub async fn set(&self, ticker: &str, series: &SeriesFrame) -> Result<(), CacheError> {
        self.cache.set(&cache_key(ticker), series).await
    }

    /// 当前缓存条目数
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.cache.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("AAPL"), "stock_data_AAPL");
        assert_eq!(cache_key("BRK-B"), "stock_data_BRK-B");
    }
}
