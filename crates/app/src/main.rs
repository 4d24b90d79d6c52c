mod cli;
mod logging;
mod settings;

use anyhow::anyhow;
use chrono::{Days, Utc};
use clap::Parser;
use cli::{Cli, Command, FetchArgs, WarmupArgs};
use std::sync::Arc;
use stocker_cache::fs::FileCache;
use stocker_cache::mem::MemCache;
use stocker_core::cache::policy::CachePolicy;
use stocker_core::cache::port::Cache;
use stocker_core::common::parse_tickers;
use stocker_core::config::{AppConfig, CacheBackend};
use stocker_core::market::port::Market;
use stocker_feed::yahoo::YahooProvider;
use stocker_market::{FetchOrchestrator, SeriesStore};
use stocker_store::SqliteSeriesArchive;
use tracing::info;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
///
/// # Logic
/// 1. 加载 `.env` 与分层配置，初始化全局日志。
/// 2. 实例化基础设施层（缓存、行情源、可选归档）。
/// 3. 构造解析服务并执行子命令。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = settings::load(cli.config.as_deref())?;
    let _guard = logging::init(&config.log)?;

    if let Command::Indicators = cli.command {
        print!("{}", cli::render_indicators());
        return Ok(());
    }

    let market = build_market(&config).await?;
    match cli.command {
        Command::Fetch(args) => fetch(market.as_ref(), &args).await,
        Command::Warmup(args) => warm_up(&market, &config, &args).await,
        Command::Indicators => Ok(()),
    }
}

/// # Summary
/// 按配置组装解析服务。
///
/// # Logic
/// 1. reqwest 使用 rustls-no-provider，进程内先安装 ring 加密提供者。
/// 2. 按 `cache.backend` 选择内存或文件缓存。
/// 3. `database.archive` 开启时连接 SQLite 归档。
async fn build_market(config: &AppConfig) -> anyhow::Result<Arc<FetchOrchestrator>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("a TLS crypto provider is already installed"))?;

    let policy = CachePolicy::from(&config.cache);
    let cache: Arc<dyn Cache> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemCache::with_policy(policy)),
        CacheBackend::File => Arc::new(FileCache::new(&config.cache.dir, policy)?),
    };
    info!(backend = ?config.cache.backend, ttl_secs = config.cache.ttl_secs, "Series store ready");

    let source = Arc::new(YahooProvider::new(&config.feed)?);
    let store = SeriesStore::new(cache);

    let market = if config.database.archive {
        let archive = Arc::new(SqliteSeriesArchive::connect(&config.database.url).await?);
        FetchOrchestrator::with_archive(source, store, archive)
    } else {
        FetchOrchestrator::new(source, store)
    };
    Ok(market)
}

async fn fetch(market: &dyn Market, args: &FetchArgs) -> anyhow::Result<()> {
    let tickers = parse_tickers(&args.tickers);
    if tickers.is_empty() {
        println!("Please enter valid ticker symbols.");
        return Ok(());
    }

    let (start, end) = args.range(Utc::now().date_naive());
    info!(tickers = tickers.len(), %start, %end, "Resolving batch");
    let outcome = market.resolve(&tickers, start, end).await;
    print!("{}", cli::render(&outcome, &tickers, &args.selection(), args.rows));
    Ok(())
}

async fn warm_up(
    market: &FetchOrchestrator,
    config: &AppConfig,
    args: &WarmupArgs,
) -> anyhow::Result<()> {
    let tickers = match &args.tickers {
        Some(list) => parse_tickers(list),
        None => config.warmup.tickers.clone(),
    };
    let days = args.days.unwrap_or(config.warmup.lookback_days);
    let end = Utc::now().date_naive();
    let start = end.checked_sub_days(Days::new(days.into())).unwrap_or(end);

    info!(tickers = tickers.len(), %start, %end, "Warming up series cache");
    let cached = market.warm_up(&tickers, start, end).await;
    println!("cached {} of {} tickers", cached, tickers.len());
    Ok(())
}
