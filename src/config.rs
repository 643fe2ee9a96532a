use crate::errors::{AutoloaderError, Result};
use crate::models::series::Ticker;
use chrono_tz::Tz;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FULL_UNIVERSE: &[&str] = &[
    "AGG", "EEM", "SPY",
    "VGK", "EWJ", "VNQ",
    "RWX", "GLD", "TLT",
    "DBC", "IEF", "SHY",
    "LQD", "PDBC", "QQQ",
    "IWM",
];

pub const TEST_UNIVERSE: &[&str] = &["AGG", "EEM", "PDBC"];

/// MM/DD/YYYY:HOUR，使用上午9点避开夏令时切换
pub const DEFAULT_START_DATE: &str = "01/29/1993:9";
pub const DEFAULT_HOUR: u32 = 9;

pub const DEFAULT_ENDPOINT: &str = "https://query1.finance.yahoo.com/v7/finance/download";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.5112.79 Safari/537.36";

pub const MERGED_FILE_NAME: &str = "merged.csv";

/// 下载失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Any failed ticker fails the whole run.
    AbortRun,
    /// Failed tickers are logged and left out of the merge.
    SkipFailed,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub universe: Vec<Ticker>,
    pub start_date: String,
    pub end_date: String,
    pub timezone: Option<Tz>,
    pub data_dir: PathBuf,
    pub endpoint: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Config {
    pub fn new() -> Self {
        Self {
            universe: FULL_UNIVERSE.iter().map(|s| Ticker::new(s)).collect(),
            start_date: DEFAULT_START_DATE.to_string(),
            end_date: today_at_default_hour(None),
            timezone: None,
            data_dir: PathBuf::from("."),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            failure_policy: FailurePolicy::AbortRun,
        }
    }

    pub fn with_universe<S: AsRef<str>>(mut self, tickers: &[S]) -> Self {
        self.universe = tickers.iter().map(|s| Ticker::new(s.as_ref())).collect();
        self
    }

    pub fn with_start_date(mut self, date: &str) -> Self {
        self.start_date = date.to_string();
        self
    }

    pub fn with_end_date(mut self, date: &str) -> Self {
        self.end_date = date.to_string();
        self
    }

    pub fn with_timezone(mut self, tz: Option<Tz>) -> Self {
        self.timezone = tz;
        self
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Path of the per-ticker record file.
    pub fn record_path(&self, ticker: &Ticker) -> PathBuf {
        self.data_dir.join(ticker.file_name())
    }

    pub fn merged_path(&self) -> PathBuf {
        self.data_dir.join(MERGED_FILE_NAME)
    }

    pub fn validate(&self) -> Result<()> {
        if self.universe.is_empty() {
            return Err(AutoloaderError::ConfigError("ticker universe is empty".to_string()));
        }
        if let Some(t) = self.universe.iter().find(|t| t.as_str().is_empty()) {
            return Err(AutoloaderError::ConfigError(format!("invalid ticker '{}'", t)));
        }
        ensure_unique(&self.universe)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// 每个标的只能出现一次：同一个 `{TICKER}.csv` 只允许一个写入者
pub fn ensure_unique(universe: &[Ticker]) -> Result<()> {
    let mut seen = HashSet::new();
    match universe.iter().find(|t| !seen.insert(t.as_str())) {
        Some(t) => Err(AutoloaderError::ConfigError(format!("duplicate ticker '{}' in universe", t))),
        None => Ok(()),
    }
}

/// 按名称获取内置的标的列表
pub fn named_universe(name: &str) -> Result<&'static [&'static str]> {
    match name.to_lowercase().as_str() {
        "full" => Ok(FULL_UNIVERSE),
        "test" => Ok(TEST_UNIVERSE),
        _ => Err(AutoloaderError::ConfigError(format!("Unknown universe: {}", name))),
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| AutoloaderError::ConfigError(format!("Unknown timezone '{}': {}", name, e)))
}

/// Today's date at the default hour, in `MM/DD/YYYY:HH` form.
pub fn today_at_default_hour(tz: Option<Tz>) -> String {
    let today = match tz {
        Some(tz) => chrono::Utc::now().with_timezone(&tz).date_naive(),
        None => chrono::Local::now().date_naive(),
    };
    format!("{}:{}", today.format("%m/%d/%Y"), DEFAULT_HOUR)
}
