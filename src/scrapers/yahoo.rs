use crate::models::series::{Ticker, TimeBound};
use crate::errors::{Result, AutoloaderError};
use crate::scrapers::base::QuoteScraper;
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use log::debug;

/// 构造 Yahoo! 历史数据 CSV 下载地址
pub fn form_query(endpoint: &str, ticker: &Ticker, start: TimeBound, end: TimeBound) -> String {
    format!(
        "{}/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
        endpoint, ticker, start, end
    )
}

/// Yahoo! Finance CSV 下载器
pub struct YahooScraper {
    client: Client,
    endpoint: String,
    user_agent: String,
}

impl YahooScraper {
    /// 按配置创建下载器
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AutoloaderError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QuoteScraper for YahooScraper {
    fn provider_code(&self) -> &'static str {
        "YAHOO"
    }

    async fn fetch_history(&self, ticker: &Ticker, start: TimeBound, end: TimeBound) -> Result<String> {
        let url = form_query(&self.endpoint, ticker, start, end);
        debug!("GET {}", url);

        let transport = |e: reqwest::Error| AutoloaderError::TransportError {
            ticker: ticker.to_string(),
            source: e,
        };

        let response = self.client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AutoloaderError::HttpStatus {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!("{} 返回 {} 字节", ticker, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENDPOINT;

    #[test]
    fn test_form_query() {
        let url = form_query(DEFAULT_ENDPOINT, &Ticker::new("SPY"), TimeBound(728316000), TimeBound(1701352800));
        assert_eq!(
            url,
            "https://query1.finance.yahoo.com/v7/finance/download/SPY?period1=728316000&period2=1701352800&interval=1d&events=history&includeAdjustedClose=true"
        );
    }

    #[test]
    fn test_form_query_has_each_parameter_once() {
        for symbol in ["AGG", "PDBC", "IWM", "X"] {
            let url = form_query("http://localhost", &Ticker::new(symbol), TimeBound(1), TimeBound(2));
            assert_eq!(url.matches("period1=").count(), 1);
            assert_eq!(url.matches("period2=").count(), 1);
            assert_eq!(url.matches("interval=1d").count(), 1);
            assert_eq!(url.matches(&format!("/{}?", symbol)).count(), 1);
        }
    }

    #[test]
    fn test_scraper_creation() {
        let config = Config::new().with_endpoint("http://127.0.0.1:9/download");
        let scraper = YahooScraper::new(&config).unwrap();
        assert_eq!(scraper.provider_code(), "YAHOO");
        assert_eq!(scraper.endpoint(), "http://127.0.0.1:9/download");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_for_ticker() {
        let config = Config::new()
            .with_endpoint("http://127.0.0.1:9/download")
            .with_request_timeout(std::time::Duration::from_secs(2));
        let scraper = YahooScraper::new(&config).unwrap();

        let err = scraper
            .fetch_history(&Ticker::new("SPY"), TimeBound(1), TimeBound(2))
            .await
            .unwrap_err();
        // a configured proxy may answer with a status instead
        assert!(matches!(
            err,
            AutoloaderError::TransportError { .. } | AutoloaderError::HttpStatus { .. }
        ));
        assert_eq!(err.ticker(), Some("SPY"));
    }
}
