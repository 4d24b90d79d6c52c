//! 测试辅助：可编程的行情数据源与合成日线。

use crate::market::entity::Bar;
use crate::market::error::MarketError;
use crate::market::port::QuoteSource;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// # Summary
/// 返回预设日线的数据源，用于编排层测试。
///
/// # Invariants
/// - 未登记的代码返回空列表。
/// - 标记为失败的代码返回 `MarketError::Network`。
/// - 每次调用都会计数，可用于断言是否命中缓存。
#[derive(Default)]
pub struct StaticQuoteSource {
    series: DashMap<String, Vec<Bar>>,
    failures: DashMap<String, String>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    calls_per_ticker: DashMap<String, usize>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次请求前休眠指定时长，模拟网络延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 登记某代码的全部日线
    pub fn insert(&self, ticker: &str, bars: Vec<Bar>) {
        self.series.insert(ticker.to_string(), bars);
    }

    /// 令某代码的请求以网络错误失败
    pub fn fail(&self, ticker: &str, message: &str) {
        self.failures.insert(ticker.to_string(), message.to_string());
    }

    /// 累计调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 某代码的累计调用次数
    pub fn calls_for(&self, ticker: &str) -> usize {
        self.calls_per_ticker.get(ticker).map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_per_ticker.entry(ticker.to_string()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = self.failures.get(ticker) {
            return Err(MarketError::Network(message.clone()));
        }

        Ok(self
            .series
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// # Summary
/// 生成确定性的合成日线（连续自然日）。
///
/// # Logic
/// 1. 收盘价为带趋势的正弦波，保证涨跌交替。
/// 2. 最高/最低价围绕收盘价上下浮动，成交量周期变化。
///
/// # Arguments
/// * `start`: 首个交易日。
/// * `n`: 生成条数。
///
/// # Returns
/// 按日期升序的日线列表。
pub fn sample_bars(start: NaiveDate, n: u32) -> Vec<Bar> {
    (0..n)
        .filter_map(|i| {
            let t = f64::from(i);
            let close = 100.0 + 8.0 * (t * 0.35).sin() + 0.15 * t;
            let spread = 1.0 + 0.5 * (t * 0.9).cos().abs();
            Some(Bar {
                date: start.checked_add_days(Days::new(u64::from(i)))?,
                open: close - 0.3 * (t * 0.5).sin(),
                high: close + spread,
                low: close - spread,
                close,
                volume: 10_000 + u64::from((i * 37) % 500) * 10,
            })
        })
        .collect()
}
