//! Trenord HTTP client.
//!
//! Fetches the raw `mia/train` payload for one train on one day. Parsing is
//! left to [`parse_train`](super::parse_train) so transport and shape errors
//! stay distinct.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::error::TrenordError;

/// Default base URL for the Trenord store-management API.
const DEFAULT_BASE_URL: &str = "https://admin.trenord.it/store-management-api";

/// Default timeout for a single request, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Source of raw train payloads.
///
/// Implemented by [`TrenordClient`] for the live API and by
/// [`MockTrenordClient`](super::MockTrenordClient) for tests and offline runs.
pub trait TrainFetcher: Send + Sync + 'static {
    /// Fetch the raw JSON body for `train_id` on `date`.
    fn fetch(
        &self,
        train_id: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<String, TrenordError>> + Send;
}

/// Configuration for the Trenord client.
#[derive(Debug, Clone)]
pub struct TrenordConfig {
    /// Base URL for the API (defaults to production Trenord)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl TrenordConfig {
    /// Create a config pointing at production.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for TrenordConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Trenord API client.
#[derive(Debug, Clone)]
pub struct TrenordClient {
    http: reqwest::Client,
    base_url: String,
}

impl TrenordClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TrenordConfig) -> Result<Self, TrenordError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the train endpoint, without the query string.
    pub fn train_url(&self, train_id: &str) -> String {
        format!("{}/mia/train/{}", self.base_url, train_id)
    }

    /// Get the raw journey payload for a train on a day.
    pub async fn get_train_raw(
        &self,
        train_id: &str,
        date: NaiveDate,
    ) -> Result<String, TrenordError> {
        let date = date.format("%Y-%m-%d").to_string();
        info!(train_id, %date, "calling Trenord API");

        let response = self
            .http
            .get(self.train_url(train_id))
            .query(&[("date", date.as_str())])
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrenordError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        debug!(train_id, bytes = body.len(), "received Trenord payload");

        Ok(body)
    }
}

impl TrainFetcher for TrenordClient {
    fn fetch(
        &self,
        train_id: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<String, TrenordError>> + Send {
        self.get_train_raw(train_id, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = TrenordConfig::new()
            .with_base_url("http://localhost:8080")
            .with_timeout(3);

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn config_defaults() {
        let config = TrenordConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn train_url() {
        let client =
            TrenordClient::new(TrenordConfig::new().with_base_url("http://localhost:8080/"))
                .unwrap();
        assert_eq!(
            client.train_url("10512"),
            "http://localhost:8080/mia/train/10512"
        );
    }
}
