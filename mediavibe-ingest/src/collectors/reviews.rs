//! Review collection from secondary sources
//!
//! Reviews are enrichment input, not a hard dependency of ingestion: an
//! unreachable source contributes an empty list and the run proceeds.

use super::ReviewSource;
use async_trait::async_trait;
use mediavibe_common::models::{RawListing, RawReview};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Review source errors (always soft at the collector level)
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct ReviewSearchResponse {
    #[serde(default)]
    reviews: Vec<RawReview>,
}

/// One HTTP-backed review source
pub struct HttpReviewSource {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpReviewSource {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, ReviewError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    /// Build the search query; TV titles get a series-flavored query
    fn search_query(listing: &RawListing) -> String {
        let detail_url = listing.detail_url.as_deref().unwrap_or("");
        if detail_url.contains("tv-show") || listing.content_type.to_lowercase().contains("tv") {
            format!("{} TV series reviews", listing.title)
        } else {
            format!("{} movie reviews", listing.title)
        }
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn collect(
        &self,
        listing: &RawListing,
        limit: usize,
    ) -> Result<Vec<RawReview>, ReviewError> {
        let url = format!("{}/reviews/search", self.base_url);
        let query = Self::search_query(listing);

        tracing::debug!(url = %url, query = %query, "Searching for reviews");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "query": query,
                "limit": limit,
            }))
            .send()
            .await
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api(status.as_u16(), error_text));
        }

        let parsed: ReviewSearchResponse = response
            .json()
            .await
            .map_err(|e| ReviewError::Parse(e.to_string()))?;

        let reviews: Vec<RawReview> = parsed
            .reviews
            .into_iter()
            .filter(|r| !r.review_text.trim().is_empty())
            .take(limit)
            .collect();

        Ok(reviews)
    }
}

/// Aggregates reviews across all configured secondary sources, best-effort
pub struct ReviewCollector {
    sources: Vec<Box<dyn ReviewSource>>,
    per_source_limit: usize,
}

impl ReviewCollector {
    pub fn new(sources: Vec<Box<dyn ReviewSource>>, per_source_limit: usize) -> Self {
        Self {
            sources,
            per_source_limit,
        }
    }

    /// Collect reviews for one listing; a failing source contributes nothing
    pub async fn collect(&self, listing: &RawListing) -> Vec<RawReview> {
        let mut reviews = Vec::new();
        for source in &self.sources {
            match source.collect(listing, self.per_source_limit).await {
                Ok(mut found) => {
                    tracing::debug!(
                        source = source.name(),
                        title = %listing.title,
                        count = found.len(),
                        "Reviews collected"
                    );
                    reviews.append(&mut found);
                }
                Err(e) => {
                    tracing::warn!(
                        source = source.name(),
                        title = %listing.title,
                        error = %e,
                        "Review source unreachable, continuing without it"
                    );
                }
            }
        }
        reviews
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl ReviewSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn collect(
            &self,
            _listing: &RawListing,
            _limit: usize,
        ) -> Result<Vec<RawReview>, ReviewError> {
            Err(ReviewError::Network("connection refused".to_string()))
        }
    }

    struct StaticSource(Vec<RawReview>);

    #[async_trait]
    impl ReviewSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn collect(
            &self,
            _listing: &RawListing,
            limit: usize,
        ) -> Result<Vec<RawReview>, ReviewError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn listing() -> RawListing {
        RawListing {
            title: "Dummy Movie".to_string(),
            content_type: "Movie".to_string(),
            ..Default::default()
        }
    }

    fn review(text: &str) -> RawReview {
        RawReview {
            source_name: "DummySite".to_string(),
            review_text: text.to_string(),
            original_score: None,
            review_url: None,
        }
    }

    #[tokio::test]
    async fn test_failing_source_is_soft() {
        let collector = ReviewCollector::new(
            vec![
                Box::new(FailingSource),
                Box::new(StaticSource(vec![review("Loved it!")])),
            ],
            3,
        );
        let reviews = collector.collect(&listing()).await;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].review_text, "Loved it!");
    }

    #[tokio::test]
    async fn test_per_source_limit_applied() {
        let collector = ReviewCollector::new(
            vec![Box::new(StaticSource(vec![
                review("one"),
                review("two"),
                review("three"),
            ]))],
            2,
        );
        let reviews = collector.collect(&listing()).await;
        assert_eq!(reviews.len(), 2);
    }

    #[test]
    fn test_tv_query_flavor() {
        let mut l = listing();
        l.content_type = "TV Show".to_string();
        assert!(HttpReviewSource::search_query(&l).contains("TV series"));
        assert!(HttpReviewSource::search_query(&listing()).contains("movie reviews"));
    }
}
