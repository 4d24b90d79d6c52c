use crate::market::frame::SeriesFrame;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 所有代码均无数据时的批次错误文案。
pub const NO_DATA_FOR_ANY_TICKER: &str = "no data could be fetched for the provided tickers";

/// 批次错误中各代码消息之间的分隔符。
pub const ERROR_SEPARATOR: &str = " | ";

/// # Summary
/// 单个交易日的 OHLCV 行情记录。
///
/// # Invariants
/// - 同一序列中 `date` 严格递增且不重复。
/// - 价格为正，成交量非负。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    // 交易日
    pub date: NaiveDate,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: u64,
}

/// # Summary
/// 单个代码在一次批量请求中的解析结果。
///
/// # Invariants
/// - `series` 为空时 `error` 必然存在。
/// - 生命周期仅限一次 `resolve` 调用，不做持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    // 证券代码
    pub ticker: String,
    // 已计算指标的序列，可能为空
    pub series: SeriesFrame,
    // 面向用户的错误描述
    pub error: Option<String>,
}

impl FetchResult {
    /// # Summary
    /// 构造成功结果；若序列为空则自动降级为“无数据”结果。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `series`: 已计算指标的序列。
    ///
    /// # Returns
    /// FetchResult 实例。
    pub fn found(ticker: impl Into<String>, series: SeriesFrame) -> Self {
        let ticker = ticker.into();
        if series.is_empty() {
            return Self::no_data(ticker);
        }
        Self {
            ticker,
            series,
            error: None,
        }
    }

    /// 构造“无数据”结果，文案格式固定为 `no data found for ticker 'X'`。
    pub fn no_data(ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        let message = format!("no data found for ticker '{}'", ticker);
        Self::failed(ticker, message)
    }

    /// 以指定错误文案构造失败结果，序列为空。
    pub fn failed(ticker: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            series: SeriesFrame::default(),
            error: Some(message.into()),
        }
    }

    /// 是否携带可用数据
    pub fn has_data(&self) -> bool {
        !self.series.is_empty()
    }
}

/// # Summary
/// 一次批量请求的汇总结果。
///
/// # Invariants
/// - 每个被请求的代码恰好对应 `results` 中的一项（重复代码合并为一项）。
/// - `error` 为 None 当且仅当所有代码均有数据或请求列表为空。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    // 代码到解析结果的映射，无顺序保证
    pub results: HashMap<String, FetchResult>,
    // 汇总后的错误文案
    pub error: Option<String>,
}

impl BatchOutcome {
    /// # Summary
    /// 将按请求顺序排列的单代码结果汇总为批次结果。
    ///
    /// # Logic
    /// 1. 按顺序写入映射，重复代码仅保留首个结果。
    /// 2. 收集无数据代码的错误文案，使用 ` | ` 拼接。
    /// 3. 若没有任何代码拿到数据，错误替换为固定的全量失败文案。
    ///
    /// # Arguments
    /// * `ordered`: 与请求顺序一致的结果列表。
    ///
    /// # Returns
    /// 汇总后的 BatchOutcome。
    pub fn from_results(ordered: Vec<FetchResult>) -> Self {
        let mut seen = HashSet::new();
        let mut messages = Vec::new();
        let mut results = HashMap::new();

        for result in ordered {
            if !seen.insert(result.ticker.clone()) {
                continue;
            }
            if !result.has_data()
                && let Some(message) = &result.error
            {
                messages.push(message.clone());
            }
            results.insert(result.ticker.clone(), result);
        }

        let succeeded = results.values().filter(|r| r.has_data()).count();
        let error = if results.is_empty() || messages.is_empty() {
            None
        } else if succeeded == 0 {
            Some(NO_DATA_FOR_ANY_TICKER.to_string())
        } else {
            Some(messages.join(ERROR_SEPARATOR))
        };

        debug!(
            tickers = results.len(),
            succeeded,
            failed = messages.len(),
            "Batch outcome assembled"
        );

        Self { results, error }
    }

    /// 仅返回有数据的代码及其序列，供图表层消费。
    pub fn series(&self) -> HashMap<&str, &SeriesFrame> {
        self.results
            .values()
            .filter(|r| r.has_data())
            .map(|r| (r.ticker.as_str(), &r.series))
            .collect()
    }

    /// 返回无数据的代码列表（按字母序）。
    pub fn failed_tickers(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self
            .results
            .values()
            .filter(|r| !r.has_data())
            .map(|r| r.ticker.as_str())
            .collect();
        failed.sort_unstable();
        failed
    }

    /// 是否所有请求的代码都失败（空请求不算失败）。
    pub fn is_total_failure(&self) -> bool {
        !self.results.is_empty() && self.results.values().all(|r| !r.has_data())
    }
}
