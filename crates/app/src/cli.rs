use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stocker_core::indicator::kind::IndicatorKind;
use stocker_core::market::entity::BatchOutcome;
use stocker_core::market::frame::columns;

/// 未指定开始日期时回看的天数
const DEFAULT_LOOKBACK_DAYS: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "stocker",
    version,
    about = "Daily stock indicators with a cached, concurrent multi-ticker fetcher",
    propagate_version = true
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./stocker.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve tickers and print the latest indicator rows
    Fetch(FetchArgs),
    /// Pre-load the cache for the configured ticker list
    Warmup(WarmupArgs),
    /// List selectable indicators and their columns
    Indicators,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Comma-separated tickers, e.g. AAPL,MSFT
    #[arg(long)]
    pub tickers: String,

    /// First date (inclusive), YYYY-MM-DD; defaults to 30 days before --end
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date (inclusive), YYYY-MM-DD; defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Indicators to show, comma-separated (default: SMA_20,SMA_50)
    #[arg(long, value_delimiter = ',')]
    pub indicators: Vec<IndicatorKind>,

    /// Number of trailing rows to print per ticker
    #[arg(long, default_value_t = 5)]
    pub rows: usize,
}

impl FetchArgs {
    /// 解析日期区间，缺省值与图表页面一致（最近 30 天）
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.end.unwrap_or(today);
        let start = self.start.unwrap_or_else(|| {
            end.checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
                .unwrap_or(end)
        });
        (start, end)
    }

    /// 选中的指标，未指定时使用默认勾选
    pub fn selection(&self) -> Vec<IndicatorKind> {
        if self.indicators.is_empty() {
            IndicatorKind::DEFAULT_SELECTION.to_vec()
        } else {
            self.indicators.clone()
        }
    }
}

#[derive(Args, Debug)]
pub struct WarmupArgs {
    /// Override the configured ticker list, comma-separated
    #[arg(long)]
    pub tickers: Option<String>,

    /// Override the configured lookback in days
    #[arg(long)]
    pub days: Option<u32>,
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// # Summary
/// 将批次结果渲染为纯文本表格。
///
/// # Logic
/// 1. 按请求顺序输出有数据的代码，每个代码打印收盘价及所选指标的最后若干行。
/// 2. 末尾输出批次错误（如有）。
///
/// # Arguments
/// * `outcome`: 批次结果。
/// * `order`: 请求顺序的代码列表（可能含重复，仅首次出现时输出）。
/// * `selection`: 选中的指标。
/// * `rows`: 每个代码输出的行数。
pub fn render(
    outcome: &BatchOutcome,
    order: &[String],
    selection: &[IndicatorKind],
    rows: usize,
) -> String {
    let mut names = vec![columns::CLOSE];
    names.extend(selection.iter().flat_map(|kind| kind.columns().iter().copied()));

    let mut out = String::new();
    let mut printed: Vec<&str> = Vec::new();
    for ticker in order {
        if printed.contains(&ticker.as_str()) {
            continue;
        }
        printed.push(ticker.as_str());
        let Some(result) = outcome.results.get(ticker).filter(|r| r.has_data()) else {
            continue;
        };

        let series = &result.series;
        out.push_str(&format!("== {} ({} rows) ==\n", ticker, series.len()));
        let header: String = names.iter().map(|n| format!("{:>14}", n)).collect();
        out.push_str(&format!("{:<12}{}\n", "Date", header));
        let first = series.len().saturating_sub(rows);
        for (row, date) in series.index().iter().enumerate().skip(first) {
            let values: String = names
                .iter()
                .map(|name| format!("{:>14}", cell(series.value(name, row))))
                .collect();
            out.push_str(&format!("{:<12}{}\n", date.to_string(), values));
        }
    }

    if let Some(error) = &outcome.error {
        out.push_str(&format!("error: {}\n", error));
    }
    out
}

/// 列出可选指标及其对应的列
pub fn render_indicators() -> String {
    IndicatorKind::ALL
        .iter()
        .map(|kind| format!("{:<24}{}\n", kind.to_string(), kind.columns().join(", ")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocker_core::market::entity::{Bar, FetchResult};
    use stocker_core::market::frame::SeriesFrame;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_parse_fetch_args() {
        let cli = Cli::try_parse_from([
            "stocker",
            "fetch",
            "--tickers",
            "aapl,msft",
            "--start",
            "2024-01-01",
            "--indicators",
            "rsi,bollinger",
            "--rows",
            "3",
        ])
        .unwrap();
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.tickers, "aapl,msft");
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(
            args.indicators,
            vec![IndicatorKind::Rsi, IndicatorKind::BollingerBands]
        );
        assert_eq!(args.rows, 3);
    }

    #[test]
    fn test_unknown_indicator_is_rejected() {
        let parsed = Cli::try_parse_from(["stocker", "fetch", "--tickers", "A", "--indicators", "vwap"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_default_range_and_selection() {
        let cli = Cli::try_parse_from(["stocker", "fetch", "--tickers", "AAPL"]).unwrap();
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        let today = date(31);
        assert_eq!(args.range(today), (date(1), today));
        assert_eq!(args.selection(), IndicatorKind::DEFAULT_SELECTION.to_vec());
    }

    #[test]
    fn test_render_lists_tail_rows_and_error() {
        let bars: Vec<Bar> = (1..=4)
            .map(|d| Bar {
                date: date(d),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: f64::from(d),
                volume: 100,
            })
            .collect();
        let outcome = BatchOutcome::from_results(vec![
            FetchResult::found("AAPL", SeriesFrame::from_bars(&bars)),
            FetchResult::no_data("BAD"),
        ]);
        let order = vec!["AAPL".to_string(), "BAD".to_string(), "AAPL".to_string()];

        let text = render(&outcome, &order, &[], 2);
        assert_eq!(text.matches("== AAPL (4 rows) ==").count(), 1);
        assert!(!text.contains("2024-05-02"));
        assert!(text.contains("2024-05-03"));
        assert!(text.contains("4.00"));
        assert!(text.ends_with("error: no data found for ticker 'BAD'\n"));
    }

    #[test]
    fn test_render_missing_indicator_cells() {
        let bars = vec![Bar {
            date: date(1),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
        }];
        let outcome = BatchOutcome::from_results(vec![FetchResult::found(
            "AAPL",
            SeriesFrame::from_bars(&bars),
        )]);
        let text = render(&outcome, &["AAPL".to_string()], &[IndicatorKind::Rsi], 5);
        assert!(text.contains("RSI"));
        assert!(text.trim_end().ends_with('-'));
    }

    #[test]
    fn test_render_indicators_lists_all() {
        let text = render_indicators();
        assert_eq!(text.lines().count(), IndicatorKind::ALL.len());
        assert!(text.contains("Upper_BB, Lower_BB"));
    }
}
