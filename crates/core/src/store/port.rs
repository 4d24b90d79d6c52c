use super::error::StoreError;
use crate::market::frame::SeriesFrame;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 已计算指标序列的关系型归档接口。
///
/// # Invariants
/// - 以 (代码, 日期) 为主键，重复写入同一天时整体替换该行。
/// - 只归档固定的一组列，未知列被忽略，缺失列写为 NULL。
#[async_trait]
pub trait SeriesArchive: Send + Sync {
    /// # Summary
    /// 保存一只证券的序列。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `series`: 已计算指标的序列表。
    ///
    /// # Returns
    /// 成功返回写入的行数。
    async fn save_series(&self, ticker: &str, series: &SeriesFrame) -> Result<usize, StoreError>;

    /// # Summary
    /// 读取闭区间 `[start, end]` 内的归档序列。
    ///
    /// # Returns
    /// 按日期升序的序列表；没有记录时返回空表。
    async fn load_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SeriesFrame, StoreError>;
}
