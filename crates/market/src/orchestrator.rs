use crate::series_store::SeriesStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use stocker_core::market::entity::{BatchOutcome, FetchResult};
use stocker_core::market::frame::SeriesFrame;
use stocker_core::market::port::{Market, QuoteSource};
use stocker_core::store::port::SeriesArchive;
use stocker_indicator::enrich;
use tracing::{debug, info, warn};

/// # Summary
/// 单个代码的解析流水线，可廉价克隆后移入后台任务。
#[derive(Clone)]
struct Pipeline {
    // 原始行情数据源
    source: Arc<dyn QuoteSource>,
    // 已计算指标序列的缓存
    store: SeriesStore,
    // 可选的关系型归档
    archive: Option<Arc<dyn SeriesArchive>>,
}

impl Pipeline {
    /// # Summary
    /// 解析单个代码：优先读缓存，未命中时请求数据源。
    ///
    /// # Logic
    /// 1. 起止日期倒置时直接返回空序列，不访问缓存与数据源。
    /// 2. 缓存命中时按日期截取，不重新计算指标。
    /// 3. 缓存读取失败按未命中处理。
    async fn resolve(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> FetchResult {
        if start > end {
            debug!(ticker, %start, %end, "Inverted date range, nothing to resolve");
            return FetchResult::no_data(ticker);
        }

        match self.store.get(ticker).await {
            Ok(Some(cached)) => {
                debug!(ticker, "Cache hit");
                return FetchResult::found(ticker, cached.slice_dates(start, end));
            }
            Ok(None) => debug!(ticker, "Cache miss"),
            Err(e) => warn!(ticker, error = %e, "Cache read failed, fetching from source"),
        }

        self.fetch_fresh(ticker, start, end).await
    }

    /// # Summary
    /// 从数据源获取日线、计算指标并回写缓存。
    ///
    /// # Logic
    /// 1. 数据源报错或返回空列表时记为“无数据”。
    /// 2. 指标计算失败时记为该代码的计算错误。
    /// 3. 成功后整体覆盖缓存；写缓存或归档失败只记录日志。
    async fn fetch_fresh(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> FetchResult {
        let bars = match self.source.fetch_history(ticker, start, end).await {
            Ok(bars) => bars,
            Err(e) => {
                warn!(ticker, source = self.source.name(), error = %e, "Quote source failed");
                return FetchResult::no_data(ticker);
            }
        };
        if bars.is_empty() {
            warn!(ticker, source = self.source.name(), "Quote source returned no rows");
            return FetchResult::no_data(ticker);
        }

        let enriched = match enrich(&SeriesFrame::from_bars(&bars)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(ticker, error = %e, "Indicator computation failed");
                return FetchResult::failed(
                    ticker,
                    format!("failed to compute indicators for ticker '{}': {}", ticker, e),
                );
            }
        };

        if let Err(e) = self.store.set(ticker, &enriched).await {
            warn!(ticker, error = %e, "Failed to write series to cache");
        }
        if let Some(archive) = &self.archive
            && let Err(e) = archive.save_series(ticker, &enriched).await
        {
            warn!(ticker, error = %e, "Failed to archive series");
        }

        debug!(ticker, rows = enriched.len(), "Series fetched and enriched");
        FetchResult::found(ticker, enriched)
    }
}

/// # Summary
/// 多代码并发解析服务，`Market` 契约的具体实现。
///
/// # Invariants
/// - 每个代码的解析都在进程级 tokio 运行时上独立派生，调用方放弃批次后任务仍会完成并写入缓存。
/// - 单个代码的失败（包括任务 panic）只体现为该代码的错误，不影响同批其他代码。
/// - 同一代码的并发请求不做合并，缓存以最后一次写入为准。
pub struct FetchOrchestrator {
    pipeline: Pipeline,
}

impl FetchOrchestrator {
    /// # Summary
    /// 创建解析服务。
    ///
    /// # Arguments
    /// * `source`: 行情数据源。
    /// * `store`: 序列缓存。
    ///
    /// # Returns
    /// 返回 FetchOrchestrator 的共享指针。
    pub fn new(source: Arc<dyn QuoteSource>, store: SeriesStore) -> Arc<Self> {
        Arc::new(Self {
            pipeline: Pipeline {
                source,
                store,
                archive: None,
            },
        })
    }

    /// 创建解析服务，并在每次成功获取后把序列写入关系型归档
    pub fn with_archive(
        source: Arc<dyn QuoteSource>,
        store: SeriesStore,
        archive: Arc<dyn SeriesArchive>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pipeline: Pipeline {
                source,
                store,
                archive: Some(archive),
            },
        })
    }

    /// 序列缓存
    pub fn store(&self) -> &SeriesStore {
        &self.pipeline.store
    }

    /// # Summary
    /// 预热缓存：跳过缓存读取，直接从数据源获取并写入一组代码。
    ///
    /// # Logic
    /// 1. 每个代码派生独立任务并发获取。
    /// 2. 统计成功写入缓存（拿到数据）的代码数量。
    ///
    /// # Arguments
    /// * `tickers`: 待预热的代码。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    ///
    /// # Returns
    /// 成功缓存的代码数。
    pub async fn warm_up(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> usize {
        if start > end {
            return 0;
        }
        let handles = tickers.iter().map(|ticker| {
            let pipeline = self.pipeline.clone();
            let ticker = ticker.clone();
            tokio::spawn(async move { pipeline.fetch_fresh(&ticker, start, end).await })
        });

        let cached = join_all(handles)
            .await
            .into_iter()
            .filter(|joined| joined.as_ref().is_ok_and(FetchResult::has_data))
            .count();
        info!(requested = tickers.len(), cached, "Cache warm-up finished");
        cached
    }
}

#[async_trait]
impl Market for FetchOrchestrator {
    /// # Summary
    /// 并发解析一批代码。
    ///
    /// # Logic
    /// 1. 空列表直接返回空结果。
    /// 2. 每个代码派生独立任务（fan-out），使用 `join_all` 等待全部完成（fan-in）。
    /// 3. 任务 panic 或被取消时记为该代码的错误。
    /// 4. 按请求顺序汇总为 `BatchOutcome`。
    async fn resolve(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> BatchOutcome {
        if tickers.is_empty() {
            return BatchOutcome::default();
        }

        let handles = tickers.iter().map(|ticker| {
            let pipeline = self.pipeline.clone();
            let ticker = ticker.clone();
            tokio::spawn(async move { pipeline.resolve(&ticker, start, end).await })
        });
        let joined = join_all(handles).await;

        let results = tickers
            .iter()
            .zip(joined)
            .map(|(ticker, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(ticker, error = %e, "Ticker resolution task aborted");
                    FetchResult::failed(
                        ticker.as_str(),
                        format!("failed to resolve ticker '{}': {}", ticker, e),
                    )
                }
            })
            .collect();

        let outcome = BatchOutcome::from_results(results);
        info!(
            requested = tickers.len(),
            resolved = outcome.series().len(),
            "Batch resolved"
        );
        outcome
    }
}
