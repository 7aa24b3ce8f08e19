//! Pipeline orchestrator
//!
//! Sequences one run through the stages:
//! Collecting → Enriching → Validating → Versioning → Loading → Completed,
//! with `Failed` reachable from any stage on a stage-fatal error. Item-level
//! failures (enrichment, validation) are recorded in the `RunResult` and
//! never fail the run. Every stage handoff is an explicit value; no stage
//! reads state it was not given.

use crate::collectors::{CatalogSource, CollectedListings, ReviewCollector};
use crate::enrich::{self, EnrichError, EnrichmentPolicy, EnrichmentProvider};
use crate::preprocess;
use crate::store::{VersionStore, Warehouse};
use crate::validate;
use chrono::Utc;
use mediavibe_common::config::IngestConfig;
use mediavibe_common::models::{
    CanonicalRecord, EnrichedRecord, FailureStage, ItemFailure, RawReview, RunResult, RunState,
};
use mediavibe_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One-run pipeline orchestrator
///
/// Owns the version store and warehouse for the duration of a run; the
/// external scheduler guarantees single-run-at-a-time.
pub struct Orchestrator {
    config: IngestConfig,
    catalog: Box<dyn CatalogSource>,
    reviews: ReviewCollector,
    provider: Arc<dyn EnrichmentProvider>,
    version_store: Box<dyn VersionStore>,
    warehouse: Warehouse,
}

impl Orchestrator {
    pub fn new(
        config: IngestConfig,
        catalog: Box<dyn CatalogSource>,
        reviews: ReviewCollector,
        provider: Arc<dyn EnrichmentProvider>,
        version_store: Box<dyn VersionStore>,
        warehouse: Warehouse,
    ) -> Self {
        Self {
            config,
            catalog,
            reviews,
            provider,
            version_store,
            warehouse,
        }
    }

    /// Execute one complete run
    ///
    /// Always returns a `RunResult`; stage-fatal errors land in
    /// `result.error` with state `Failed` rather than propagating, so the
    /// caller can report the accumulated counts either way.
    pub async fn run(&self, cancel_token: CancellationToken) -> RunResult {
        let run_id = Uuid::new_v4();
        let mut result = RunResult::new(run_id);

        tracing::info!(
            run_id = %run_id,
            lookback_days = self.config.lookback_days,
            "Starting ingestion run"
        );

        match self.execute(&mut result, &cancel_token).await {
            Ok(()) => {
                self.transition(&mut result, RunState::Completed);
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Run failed");
                result.error = Some(e.to_string());
                self.transition(&mut result, RunState::Failed);
            }
        }

        result.finished_at = Some(Utc::now());
        tracing::info!(
            run_id = %run_id,
            state = %result.state,
            fetched = result.fetched,
            processed = result.processed,
            skipped = result.skipped,
            failed = result.failed,
            loaded = result.loaded,
            snapshot_id = result.snapshot_id.as_deref().unwrap_or("none"),
            "Run finished"
        );
        result
    }

    async fn execute(
        &self,
        result: &mut RunResult,
        cancel_token: &CancellationToken,
    ) -> Result<()> {
        // Stage 1: collect listings, reviews, raw capture, preprocess
        self.transition(result, RunState::Collecting);
        let collected = self.collect_with_retry().await?;
        if !collected.complete {
            tracing::warn!(
                fetched = collected.listings.len(),
                "Catalog batch is incomplete, proceeding with partial listings"
            );
        }
        result.fetched = collected.listings.len();

        if collected.listings.is_empty() {
            tracing::info!("No new listings in window, nothing to ingest");
            return Ok(());
        }

        let canonical = self.gather_and_normalize(result.run_id, &collected).await?;

        // Unchanged content hash: reuse the prior enrichment, skip the call
        let mut to_enrich = Vec::new();
        for record in canonical {
            match self.warehouse.load_enriched(&record.id).await? {
                Some(stored) if stored.content_hash() == record.content_hash => {
                    tracing::debug!(
                        id = %record.id,
                        ingested_at = %stored.data_ingestion_timestamp,
                        "Content hash unchanged, reusing stored enrichment"
                    );
                    result.skipped += 1;
                }
                _ => to_enrich.push(record),
            }
        }

        // Stage 2: enrich with bounded fan-out
        self.transition(result, RunState::Enriching);
        let policy = EnrichmentPolicy {
            max_attempts: self.config.max_attempts,
            backoff_base_ms: self.config.backoff_base_ms,
            max_concurrency: self.config.max_concurrency,
        };
        let outcomes =
            enrich::enrich_batch(self.provider.clone(), to_enrich, &policy, cancel_token).await;

        if cancel_token.is_cancelled() {
            // In-flight calls have drained; nothing partial was emitted
            return Err(Error::Cancelled);
        }

        let ingested_at = Utc::now();
        let mut enriched = Vec::new();
        for (record, outcome) in outcomes {
            match outcome {
                Ok(enrichment) => {
                    enriched.push(EnrichedRecord::new(record, enrichment, ingested_at));
                }
                Err(EnrichError::Cancelled) => {
                    // Unreachable without a cancelled token, handled above
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    result.record_failure(ItemFailure {
                        id: record.id.clone(),
                        title: record.title.clone(),
                        stage: FailureStage::Enrichment,
                        reason: e.to_string(),
                    });
                }
            }
        }
        result.processed = enriched.len();

        // Stage 3: validate
        self.transition(result, RunState::Validating);
        let outcome = validate::validate(enriched);
        for (record, reason) in outcome.rejected {
            result.record_failure(ItemFailure {
                id: record.id().to_string(),
                title: record.canonical.title.clone(),
                stage: FailureStage::Validation,
                reason,
            });
        }

        if outcome.accepted.is_empty() {
            tracing::info!("No accepted records this run, nothing to version or load");
            return Ok(());
        }

        // Stage 4: snapshot the accepted batch
        self.transition(result, RunState::Versioning);
        let version_id = self
            .version_store
            .put(&outcome.accepted, result.run_id)
            .await?;
        result.snapshot_id = Some(version_id.clone());

        // Stage 5: load from the committed snapshot, never from memory
        self.transition(result, RunState::Loading);
        let committed = self
            .version_store
            .get(&version_id)
            .await
            .map_err(|e| Error::Load(format!("read snapshot {}: {}", version_id, e)))?;
        result.loaded = self.warehouse.load(&committed).await?;

        Ok(())
    }

    /// Collect reviews per listing (best-effort), capture raw inputs, and
    /// normalize into canonical records
    async fn gather_and_normalize(
        &self,
        run_id: Uuid,
        collected: &CollectedListings,
    ) -> Result<Vec<CanonicalRecord>> {
        let mut canonical = Vec::with_capacity(collected.listings.len());
        let mut reviews_by_id: HashMap<String, Vec<RawReview>> = HashMap::new();

        for listing in &collected.listings {
            let reviews = self.reviews.collect(listing).await;
            let record = preprocess::normalize(listing, &reviews);
            reviews_by_id.insert(record.id.clone(), reviews);
            canonical.push(record);
        }

        self.version_store
            .capture_raw(run_id, &collected.listings, &reviews_by_id)
            .await?;

        Ok(canonical)
    }

    /// Retry whole-collection attempts at the collection boundary only
    async fn collect_with_retry(&self) -> Result<CollectedListings> {
        let mut attempt = 1;
        loop {
            match self.catalog.collect(self.config.lookback_days).await {
                Ok(collected) => return Ok(collected),
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let delay = enrich::backoff_delay(self.config.backoff_base_ms, attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Catalog collection failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(Error::SourceUnavailable(e.to_string())),
            }
        }
    }

    fn transition(&self, result: &mut RunResult, state: RunState) {
        tracing::info!(run_id = %result.run_id, from = %result.state, to = %state, "Stage transition");
        result.state = state;
    }
}
