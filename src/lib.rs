// 公开导出的模块，供外部使用
pub mod models;
pub mod errors;
pub mod config;
pub mod scrapers;
pub mod services;
pub mod util;

// 重新导出常用类型，方便使用
pub use models::series::{Ticker, TimeBound, RowCounts};
pub use config::{Config, FailurePolicy};
pub use services::autoload_service::{AutoloadService, RunSummary};
pub use services::merge_service::{merge_records, MergeSummary};
pub use errors::{Result, AutoloaderError};
