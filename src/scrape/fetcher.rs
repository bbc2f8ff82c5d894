//! Metrics fetcher for retrieving Prometheus metrics from an HTTP endpoint

use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

use crate::error::ScrapeError;

const TEXT_FORMAT: &str = "text/plain;version=0.0.4;q=1,*/*;q=0.1";

/// HTTP client wrapper for fetching metrics
pub struct MetricsFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl MetricsFetcher {
    /// Create a new metrics fetcher
    ///
    /// # Arguments
    /// * `url` - Full URL to the metrics endpoint (e.g., "http://localhost:8080/metrics")
    /// * `timeout` - Upper bound for one scrape, connect and body included
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch metrics from the endpoint
    ///
    /// # Returns
    /// Raw Prometheus text format as a String
    ///
    /// # Errors
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Response status is not successful (2xx)
    /// - Response body cannot be read as text
    pub async fn fetch(&self) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, TEXT_FORMAT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScrapeError::Status(response.status()));
        }

        response.text().await.map_err(ScrapeError::Body)
    }
}

/// Join scheme, host and path into a scrape URL
pub fn target_url(scheme: &str, host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}://{}{}", scheme, host, path)
    } else {
        format!("{}://{}/{}", scheme, host, path)
    }
}
