use crate::models::series::{Ticker, TimeBound};
use crate::errors::Result;
use async_trait::async_trait;

/// Base trait for daily quote history sources
#[async_trait]
pub trait QuoteScraper {
    /// Name of the provider this scraper talks to
    fn provider_code(&self) -> &'static str;

    /// Fetch the raw delimited history for one ticker between two bounds.
    /// The body is returned exactly as the provider sent it.
    async fn fetch_history(&self, ticker: &Ticker, start: TimeBound, end: TimeBound) -> Result<String>;
}
