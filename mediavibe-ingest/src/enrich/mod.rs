//! Enrichment stage: LLM provider interface, retry policy, bounded fan-out
//!
//! Items are enriched concurrently up to a configured in-flight maximum;
//! per-item failures never block sibling items. Transient provider errors
//! are retried with exponential backoff up to a bounded attempt count, after
//! which the item is recorded as failed and excluded downstream.

pub mod llm;

pub use llm::LlmEnrichmentClient;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mediavibe_common::models::{CanonicalRecord, Enrichment};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Enrichment provider errors
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Provider produced output that failed strict parsing (including a
    /// score outside [1,10]); never retried
    #[error("Malformed provider output: {0}")]
    Malformed(String),

    /// Call was never issued because the run was cancelled
    #[error("Enrichment cancelled")]
    Cancelled,
}

impl EnrichError {
    pub fn is_transient(&self) -> bool {
        match self {
            EnrichError::Network(_) | EnrichError::Timeout | EnrichError::RateLimited => true,
            EnrichError::Api(status, _) => *status >= 500,
            EnrichError::Malformed(_) | EnrichError::Cancelled => false,
        }
    }
}

/// External language-model provider
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Derive summary, score, tags, and genres for one canonical record
    async fn enrich(&self, record: &CanonicalRecord) -> Result<Enrichment, EnrichError>;
}

/// Retry and concurrency parameters for the enrichment stage
#[derive(Debug, Clone)]
pub struct EnrichmentPolicy {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub max_concurrency: usize,
}

const BACKOFF_MAX_EXP: u32 = 16;

/// Backoff delay before retrying after `attempt` (1-based) failed
///
/// Doubles per attempt from the base delay. The exponent is capped so an
/// oversized attempt budget cannot overflow the multiplier.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(BACKOFF_MAX_EXP);
    Duration::from_millis(base_ms.saturating_mul(1u64 << exp))
}

/// Enrich one record with bounded retries and exponential backoff
///
/// Only transient errors are retried; malformed output fails the item
/// immediately. Backoff doubles per attempt starting from the base delay.
pub async fn enrich_with_retry(
    provider: &dyn EnrichmentProvider,
    record: &CanonicalRecord,
    policy: &EnrichmentPolicy,
    cancel_token: &CancellationToken,
) -> Result<Enrichment, EnrichError> {
    let mut attempt = 1;
    loop {
        match provider.enrich(record).await {
            Ok(enrichment) => return Ok(enrichment),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = backoff_delay(policy.backoff_base_ms, attempt);
                tracing::warn!(
                    id = %record.id,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient enrichment failure, backing off"
                );
                tokio::time::sleep(delay).await;
                if cancel_token.is_cancelled() {
                    return Err(EnrichError::Cancelled);
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Enrich a batch with bounded concurrency
///
/// Cancellation stops issuing new calls; in-flight calls drain to completion
/// and no partial enrichment is emitted for a cancelled item.
pub async fn enrich_batch(
    provider: Arc<dyn EnrichmentProvider>,
    records: Vec<CanonicalRecord>,
    policy: &EnrichmentPolicy,
    cancel_token: &CancellationToken,
) -> Vec<(CanonicalRecord, Result<Enrichment, EnrichError>)> {
    let policy = policy.clone();
    stream::iter(records)
        .map(|record| {
            let provider = provider.clone();
            let policy = policy.clone();
            let cancel_token = cancel_token.clone();
            async move {
                if cancel_token.is_cancelled() {
                    return (record, Err(EnrichError::Cancelled));
                }
                let outcome =
                    enrich_with_retry(provider.as_ref(), &record, &policy, &cancel_token).await;
                (record, outcome)
            }
        })
        .buffer_unordered(policy.max_concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.to_string(),
            title: "Dummy Movie".to_string(),
            content_type: "movie".to_string(),
            streaming_platforms: "Netflix".to_string(),
            release_year: Some(2025),
            release_date_text: "2025-01-01".to_string(),
            detail_url: String::new(),
            source_genres: "Action".to_string(),
            imdb_rating: None,
            rotten_tomatoes_rating: None,
            synopsis: "A dummy movie.".to_string(),
            cast_members: "[]".to_string(),
            directors: "[]".to_string(),
            duration_text: String::new(),
            maturity_rating: None,
            language: None,
            country: None,
            scraped_reviews: "[]".to_string(),
            content_hash: "abc".to_string(),
        }
    }

    fn enrichment() -> Enrichment {
        Enrichment {
            summary: "Great movie!".to_string(),
            score: 8.5,
            vibe_tags: vec!["exciting".to_string(), "fun".to_string()],
            primary_genre: "Action".to_string(),
            secondary_genres: vec![],
        }
    }

    fn policy() -> EnrichmentPolicy {
        EnrichmentPolicy {
            max_attempts: 3,
            backoff_base_ms: 1,
            max_concurrency: 4,
        }
    }

    /// Fails transiently `failures` times, then succeeds
    struct FlakyProvider {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EnrichmentProvider for FlakyProvider {
        async fn enrich(&self, _record: &CanonicalRecord) -> Result<Enrichment, EnrichError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(EnrichError::Timeout)
            } else {
                Ok(enrichment())
            }
        }
    }

    struct MalformedProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EnrichmentProvider for MalformedProvider {
        async fn enrich(&self, _record: &CanonicalRecord) -> Result<Enrichment, EnrichError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EnrichError::Malformed("score out of range: 15".to_string()))
        }
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_capped_for_large_attempt_counts() {
        // Must not panic or overflow for attempt counts past the shift width
        let capped = backoff_delay(500, 100);
        assert_eq!(capped, backoff_delay(500, BACKOFF_MAX_EXP + 1));
        assert_eq!(backoff_delay(u64::MAX, 100), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_transient_failures_retried_within_budget() {
        let provider = FlakyProvider {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        let result =
            enrich_with_retry(&provider, &record("a"), &policy(), &CancellationToken::new()).await;
        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion() {
        let provider = FlakyProvider {
            failures: 5,
            calls: AtomicUsize::new(0),
        };
        let result =
            enrich_with_retry(&provider, &record("a"), &policy(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(EnrichError::Timeout)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_output_never_retried() {
        let provider = MalformedProvider {
            calls: AtomicUsize::new(0),
        };
        let result =
            enrich_with_retry(&provider, &record("a"), &policy(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(EnrichError::Malformed(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_isolates_item_failures() {
        struct PerIdProvider;

        #[async_trait]
        impl EnrichmentProvider for PerIdProvider {
            async fn enrich(&self, record: &CanonicalRecord) -> Result<Enrichment, EnrichError> {
                if record.id == "bad" {
                    Err(EnrichError::Malformed("unparseable".to_string()))
                } else {
                    Ok(enrichment())
                }
            }
        }

        let results = enrich_batch(
            Arc::new(PerIdProvider),
            vec![record("good1"), record("bad"), record("good2")],
            &policy(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(results.len(), 3);
        let ok = results.iter().filter(|(_, r)| r.is_ok()).count();
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        assert_eq!(ok, 2);
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_new_calls() {
        struct CountingProvider {
            calls: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl EnrichmentProvider for CountingProvider {
            async fn enrich(&self, _record: &CanonicalRecord) -> Result<Enrichment, EnrichError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(enrichment())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        token.cancel();

        let results = enrich_batch(
            Arc::new(CountingProvider {
                calls: calls.clone(),
            }),
            vec![record("a"), record("b")],
            &policy(),
            &token,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(results
            .iter()
            .all(|(_, r)| matches!(r, Err(EnrichError::Cancelled))));
    }
}
