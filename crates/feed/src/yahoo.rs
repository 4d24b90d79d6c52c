use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use stocker_core::config::FeedConfig;
use stocker_core::market::entity::Bar;
use stocker_core::market::error::MarketError;
use stocker_core::market::port::QuoteSource;
use tracing::{debug, warn};

/// # Summary
/// Yahoo Finance 日线数据源实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，只请求 `1d` 周期。
/// - 返回的日线按日期升序且无重复日期。
#[derive(Clone)]
pub struct YahooProvider {
    // 内部使用的 HTTP 客户端
    client: Client,
    // 接口根地址，测试时可指向本地服务
    base_url: Url,
}

impl YahooProvider {
    /// # Summary
    /// 按配置创建 YahooProvider。
    ///
    /// # Logic
    /// 1. 配置请求超时。
    /// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 数据源配置。
    ///
    /// # Returns
    /// 客户端构建失败（如 TLS 提供者未安装）时返回 `MarketError::Unknown`。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let agent = config
            .user_agent
            .parse()
            .map_err(|e| MarketError::Unknown(format!("invalid user agent: {}", e)))?;
        headers.insert(reqwest::header::USER_AGENT, agent);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| MarketError::Unknown(format!("failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| MarketError::Unknown(format!("invalid base url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(MarketError::Unknown(format!(
                "invalid base url: {}",
                config.base_url
            )));
        }

        Ok(Self { client, base_url })
    }

}

/// 代码作为单独的路径段写入并转义，避免 `/`、`?` 等字符改变请求目标
fn chart_url(base: &Url, ticker: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
    }
    url
}

/// Yahoo v8 chart 接口响应顶层结构
#[derive(Deserialize, Debug)]
pub(crate) struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: Option<String>,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    // 区间内没有交易日时该字段缺失
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    // 交易所相对 UTC 的偏移（秒），用于还原交易日
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    // 复权收盘价，部分标的或区间缺失
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo 原始报价数据，各字段按下标与 timestamp 对齐
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// # Summary
/// 将 chart 响应转换为日线列表。
///
/// # Logic
/// 1. 接口返回错误对象时：`Not Found` 映射为 `NotFound`，其余为 `Unknown`。
/// 2. 时间戳加上交易所偏移后取日期作为交易日。
/// 3. 丢弃任一字段缺失的记录以及区间外的记录。
/// 4. 存在复权收盘价时，开高低收按 `adjclose / close` 等比缩放；缺失时保留原始价格。
/// 5. 按日期排序并去重（保留最后出现的记录）。
pub(crate) fn parse_chart(
    response: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>, MarketError> {
    if let Some(err) = response.chart.error {
        return match err.code.as_deref() {
            Some("Not Found") => Err(MarketError::NotFound),
            _ => Err(MarketError::Unknown(err.description)),
        };
    }

    let Some(result) = response.chart.result.and_then(|mut r| r.pop()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };

    let adjusted = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|list| list.first())
        .map(|a| a.adjclose.as_slice());
    let offset = result.meta.gmtoffset;
    let mut bars: Vec<Bar> = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let field = |column: &[Option<f64>]| column.get(i).copied().flatten();
        let row = (
            DateTime::from_timestamp(ts.saturating_add(offset), 0).map(|dt| dt.date_naive()),
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            quote.volume.get(i).copied().flatten(),
        );
        match row {
            (Some(date), Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                if date >= start && date <= end {
                    let ratio = adjusted
                        .and_then(field)
                        .filter(|_| close != 0.0)
                        .map_or(1.0, |adj| adj / close);
                    bars.push(Bar {
                        date,
                        open: open * ratio,
                        high: high * ratio,
                        low: low * ratio,
                        close: close * ratio,
                        volume,
                    });
                }
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "Dropped incomplete rows from chart response");
    }

    // 稳定排序后反向去重，同一日期保留最后一条
    bars.sort_by_key(|b| b.date);
    bars.reverse();
    bars.dedup_by_key(|b| b.date);
    bars.reverse();
    Ok(bars)
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl QuoteSource for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取日线历史数据。
    ///
    /// # Logic
    /// 1. 构建包含 period1、period2 的 API URL；period2 取结束日次日零点以包含结束日。
    /// 2. 发起异步请求，404 视为代码不存在。
    /// 3. 解析嵌套的 JSON 数据并裁剪到请求区间。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    ///
    /// # Returns
    /// 成功返回日线列表，失败返回 MarketError。
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, MarketError> {
        if start > end {
            return Ok(Vec::new());
        }
        let period2 = end.checked_add_days(Days::new(1)).unwrap_or(end);

        let resp = self
            .client
            .get(chart_url(&self.base_url, ticker))
            .query(&[
                ("period1", unix_seconds(start).to_string()),
                ("period2", unix_seconds(period2).to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(ticker, "Yahoo returned 404");
            return Err(MarketError::NotFound);
        }
        if !status.is_success() {
            warn!(ticker, %status, "Yahoo request failed");
            return Err(MarketError::Network(format!("HTTP {}", status)));
        }

        let json: ChartResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let bars = parse_chart(json, start, end)?;
        debug!(ticker, rows = bars.len(), "Fetched daily bars from Yahoo");
        Ok(bars)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
