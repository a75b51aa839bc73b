use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::{Config, RetryConfig};
use crate::error::McpResult;

/// Shared HTTP client for the external knowledge sources (abp.io pages and
/// the GitHub search API). Every request is bounded by the configured
/// timeout and retried with exponential backoff on transient failures.
pub struct AbpClient {
    http: reqwest::Client,
    retry: RetryConfig,
}

impl AbpClient {
    pub fn new(config: &Config) -> McpResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connection.timeout_seconds))
            .user_agent(concat!("abp-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            retry: config.retry.clone(),
        })
    }

    /// Fetch a page as text (HTML scraping sources).
    pub async fn get_text(&self, url: &str) -> McpResult<String> {
        let response = self.get_with_retry(url, &[]).await?;
        Ok(response.text().await?)
    }

    /// Fetch a JSON document (REST API sources).
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> McpResult<T> {
        let response = self.get_with_retry(url, query).await?;
        Ok(response.json().await?)
    }

    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> McpResult<reqwest::Response> {
        let max_delay = Duration::from_millis(self.retry.max_delay_ms);
        let mut delay = Duration::from_millis(self.retry.initial_delay_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = self
                .http
                .get(url)
                .query(query)
                .header("Accept", "application/json, text/html;q=0.9, */*;q=0.8")
                .send()
                .await;

            let transient = match &result {
                Ok(response) => {
                    let status = response.status();
                    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
                }
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if !transient || attempt >= self.retry.max_attempts {
                return Ok(result?.error_for_status()?);
            }

            match &result {
                Ok(response) => warn!(
                    "Transient HTTP {} from {}, retrying (attempt {}/{})",
                    response.status(),
                    url,
                    attempt,
                    self.retry.max_attempts
                ),
                Err(e) => warn!(
                    "Request to {} failed: {}, retrying (attempt {}/{})",
                    url, e, attempt, self.retry.max_attempts
                ),
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(max_delay);
        }
    }
}
