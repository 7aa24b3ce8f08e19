//! HTTP catalog source
//!
//! Fetches the "new releases" feed from the catalog scraping API, one page
//! at a time, with a per-request timeout and polite pacing between pages.
//! Retry across whole-collection attempts lives at the orchestrator's
//! collection boundary; this client reports what one attempt produced.

use super::{CatalogSource, CollectedListings};
use async_trait::async_trait;
use mediavibe_common::models::RawListing;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const PAGE_PAUSE_MS: u64 = 1000;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Transient failures are worth retrying at the collection boundary
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network(_) | CatalogError::Timeout | CatalogError::RateLimited => true,
            CatalogError::Api(status, _) => *status >= 500,
            CatalogError::Parse(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListingsPage {
    #[serde(default)]
    items: Vec<RawListing>,
    #[serde(default)]
    next_page: Option<u32>,
}

/// Enforces a minimum interval between page requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Catalog source backed by the scraping API
pub struct HttpCatalogSource {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpCatalogSource {
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(PAGE_PAUSE_MS)),
        })
    }

    async fn fetch_page(&self, window_days: u32, page: u32) -> Result<ListingsPage, CatalogError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/listings/new", self.base_url);
        tracing::debug!(url = %url, page, window_days, "Fetching catalog page");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "windowDays": window_days,
                "page": page,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CatalogError::Timeout
                } else {
                    CatalogError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CatalogError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn collect(&self, window_days: u32) -> Result<CollectedListings, CatalogError> {
        let mut listings = Vec::new();
        let mut page = 1u32;

        loop {
            match self.fetch_page(window_days, page).await {
                Ok(fetched) => {
                    tracing::debug!(page, items = fetched.items.len(), "Catalog page fetched");
                    listings.extend(fetched.items);
                    match fetched.next_page {
                        Some(next) => page = next,
                        None => break,
                    }
                }
                Err(e) if listings.is_empty() => return Err(e),
                Err(e) => {
                    // Keep the prefix, flag the batch incomplete
                    tracing::warn!(
                        page,
                        fetched = listings.len(),
                        error = %e,
                        "Pagination failed partway, returning partial listings"
                    );
                    return Ok(CollectedListings {
                        listings,
                        complete: false,
                    });
                }
            }
        }

        tracing::info!(count = listings.len(), "Catalog collection complete");
        Ok(CollectedListings {
            listings,
            complete: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CatalogError::Timeout.is_transient());
        assert!(CatalogError::RateLimited.is_transient());
        assert!(CatalogError::Api(503, String::new()).is_transient());
        assert!(!CatalogError::Api(401, String::new()).is_transient());
        assert!(!CatalogError::Parse("bad json".to_string()).is_transient());
    }

    #[test]
    fn test_client_creation() {
        let client = HttpCatalogSource::new(
            "https://api.example.com/v1".to_string(),
            "key".to_string(),
            Duration::from_secs(30),
        );
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(200);

        let start = Instant::now();
        limiter.wait().await;
        let first_elapsed = start.elapsed();
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
    }
}
