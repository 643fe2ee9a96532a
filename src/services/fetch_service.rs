use crate::models::series::{RowCounts, Ticker, TimeBound};
use crate::scrapers::base::QuoteScraper;
use crate::errors::{Result, AutoloaderError};
use crate::config::{self, Config, FailurePolicy};
use crate::util;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::sync::Arc;

/// 下载服务：并发下载所有标的并写入 `{TICKER}.csv`
pub struct FetchService {
    config: Arc<Config>,
    scraper: Arc<dyn QuoteScraper + Send + Sync>,
}

impl FetchService {
    pub fn new(config: Arc<Config>, scraper: Arc<dyn QuoteScraper + Send + Sync>) -> Self {
        Self { config, scraper }
    }

    /// Downloads one ticker and overwrites its record file with the body as received.
    /// Returns the record's row count, header included.
    pub async fn fetch_one(&self, ticker: &Ticker, start: TimeBound, end: TimeBound) -> Result<usize> {
        let body = self.scraper.fetch_history(ticker, start, end).await?;
        let rows = util::count_rows(&body);

        let path = self.config.record_path(ticker);
        tokio::fs::write(&path, body.as_bytes())
            .await
            .map_err(|e| AutoloaderError::io(&path, e))?;

        info!("{} created ({} rows).", ticker, rows);
        Ok(rows)
    }

    /// 并发下载整个 universe，每个标的一个任务
    pub async fn fetch_all(&self, universe: &[Ticker], start: TimeBound, end: TimeBound) -> Result<RowCounts> {
        if universe.is_empty() {
            return Err(AutoloaderError::ConfigError("ticker universe is empty".to_string()));
        }
        config::ensure_unique(universe)?;

        tokio::fs::create_dir_all(&self.config.data_dir)
            .await
            .map_err(|e| AutoloaderError::io(&self.config.data_dir, e))?;

        info!("Fetching {} tickers from {}", universe.len(), self.scraper.provider_code());
        let concurrency = universe.len();
        let units = stream::iter(universe.iter().enumerate())
            .map(|(idx, ticker)| async move {
                let result = self.fetch_one(ticker, start, end).await;
                (idx, result)
            })
            .buffer_unordered(concurrency);

        let mut finished: Vec<(usize, usize)> = match self.config.failure_policy {
            FailurePolicy::AbortRun => {
                // 任一标的失败即终止，其余未完成的请求被丢弃
                units
                    .map(|(idx, result)| result.map(|rows| (idx, rows)))
                    .try_collect()
                    .await?
            }
            FailurePolicy::SkipFailed => {
                let results: Vec<(usize, Result<usize>)> = units.collect().await;
                results
                    .into_iter()
                    .filter_map(|(idx, result)| match result {
                        Ok(rows) => Some((idx, rows)),
                        Err(e) => {
                            warn!("Skipping {}: {}", universe[idx], e);
                            None
                        }
                    })
                    .collect()
            }
        };

        if finished.is_empty() {
            return Err(AutoloaderError::NoRecords);
        }

        finished.sort_by_key(|(idx, _)| *idx);
        let mut counts = RowCounts::new();
        for (idx, rows) in finished {
            counts.push(universe[idx].clone(), rows);
        }

        debug!("Row counts: {:?}", counts);
        Ok(counts)
    }
}
