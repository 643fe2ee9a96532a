use crate::config::Config;
use crate::errors::{Result, AutoloaderError};
use crate::models::series::{RowCounts, TimeBound};
use crate::scrapers::base::QuoteScraper;
use crate::services::fetch_service::FetchService;
use crate::services::merge_service::{self, MergeSummary};
use crate::util;
use log::info;
use std::sync::Arc;

/// 一次完整运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub start: TimeBound,
    pub end: TimeBound,
    pub row_counts: RowCounts,
    pub merge: MergeSummary,
}

/// 自动下载服务：计算时间范围，并发下载，再合并为 `merged.csv`
pub struct AutoloadService {
    config: Arc<Config>,
    fetcher: FetchService,
}

impl AutoloadService {
    pub fn new(config: Config, scraper: Arc<dyn QuoteScraper + Send + Sync>) -> Self {
        let config = Arc::new(config);
        let fetcher = FetchService::new(config.clone(), scraper);
        Self { config, fetcher }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Encodes and checks the configured start and end bounds.
    pub fn time_bounds(&self) -> Result<(TimeBound, TimeBound)> {
        let start = util::encode_time_bound(&self.config.start_date, self.config.timezone)?;
        let end = util::encode_time_bound(&self.config.end_date, self.config.timezone)?;
        util::ensure_ordered(start, end)?;
        Ok((start, end))
    }

    /// 只下载，不合并
    pub async fn fetch(&self) -> Result<RowCounts> {
        self.config.validate()?;
        let (start, end) = self.time_bounds()?;
        info!("Fetching {} to {} ({} .. {})", self.config.start_date, self.config.end_date, start, end);
        self.fetcher.fetch_all(&self.config.universe, start, end).await
    }

    /// 下载全部标的后合并，行数取各标的最小行数
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let (start, end) = self.time_bounds()?;
        info!("Fetching {} to {} ({} .. {})", self.config.start_date, self.config.end_date, start, end);

        let row_counts = self.fetcher.fetch_all(&self.config.universe, start, end).await?;
        let budget = row_counts.min().ok_or(AutoloaderError::NoRecords)?;

        let datasets: Vec<_> = row_counts.tickers().map(|t| self.config.record_path(t)).collect();
        let merge = merge_service::merge_records(&datasets, budget, &self.config.merged_path())?;

        info!("Run complete: {} tickers, {} merged rows", row_counts.len(), merge.rows);
        Ok(RunSummary { start, end, row_counts, merge })
    }
}
