use crate::market::entity::{Bar, BatchOutcome};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 行情数据源接口（原始日线提供者）。
///
/// # Invariants
/// - 每个数据供应商一个实现，编排层与指标引擎不感知具体供应商。
/// - 返回的记录按日期升序、无重复日期。
/// - 没有数据时应返回空列表；返回错误同样被视为“无数据”。
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// # Summary
    /// 获取指定代码在闭区间 `[start, end]` 内的日线数据。
    ///
    /// # Logic
    /// 1. 构建数据源请求。
    /// 2. 执行网络请求并解析响应数据。
    /// 3. 丢弃字段不完整的记录。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    ///
    /// # Returns
    /// 成功返回日线列表（可能为空），失败返回 MarketError。
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, MarketError>;

    /// 数据源名称，用于日志
    fn name(&self) -> &str;
}

/// # Summary
/// 多代码批量解析服务契约，是外部应用唯一调用的入口。
///
/// # Invariants
/// - 同一批次内各代码并发解析，单个代码的失败不得取消或阻塞其余代码。
/// - 所有错误以数据形式返回，不向调用方抛出。
#[async_trait]
pub trait Market: Send + Sync {
    /// # Summary
    /// 解析一批代码在闭区间内的已计算指标序列。
    ///
    /// # Logic
    /// 1. 对每个代码：命中缓存则按日期截取；否则请求数据源并计算指标后回写缓存。
    /// 2. 等待所有代码完成后汇总错误。
    ///
    /// # Arguments
    /// * `tickers`: 代码列表，允许为空或包含重复项。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    ///
    /// # Returns
    /// 代码到解析结果的映射以及汇总错误。
    async fn resolve(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> BatchOutcome;
}
