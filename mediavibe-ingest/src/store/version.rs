//! Content-addressed snapshot store
//!
//! Two logical areas under one root, mirroring the raw/processed object
//! storage split:
//!
//! - `raw/<run_id>/`: per-run capture of listings and reviews as fetched
//! - `processed/snapshots/<version_id>/`: accepted enriched batches
//!
//! Snapshots are append-only and addressed by the SHA-256 of their
//! serialized content: committing an identical batch yields the identical
//! version id without rewriting anything, and a differing batch can never
//! land on an existing id. The warehouse loader always loads from a
//! committed snapshot, so a crash between snapshot and load is recovered by
//! re-running the load from the last version id.

use async_trait::async_trait;
use chrono::Utc;
use mediavibe_common::models::{EnrichedRecord, RawListing, RawReview};
use mediavibe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Snapshot manager interface (`put`/`get` by version id)
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Capture the raw inputs of one run (immutable, audit only)
    async fn capture_raw(
        &self,
        run_id: Uuid,
        listings: &[RawListing],
        reviews: &HashMap<String, Vec<RawReview>>,
    ) -> Result<()>;

    /// Commit an accepted batch; returns its content-addressed version id
    async fn put(&self, records: &[EnrichedRecord], run_id: Uuid) -> Result<String>;

    /// Retrieve a previously committed batch by version id
    async fn get(&self, version_id: &str) -> Result<Vec<EnrichedRecord>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotManifest {
    version_id: String,
    run_id: Uuid,
    record_count: usize,
    created_at: chrono::DateTime<Utc>,
}

/// Filesystem-backed version store
pub struct FsVersionStore {
    root: PathBuf,
}

impl FsVersionStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn raw_dir(&self, run_id: Uuid) -> PathBuf {
        self.root.join("raw").join(run_id.to_string())
    }

    fn snapshot_dir(&self, version_id: &str) -> PathBuf {
        self.root.join("processed").join("snapshots").join(version_id)
    }

    /// Write via temp file + rename so a crash never leaves a torn file
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl VersionStore for FsVersionStore {
    async fn capture_raw(
        &self,
        run_id: Uuid,
        listings: &[RawListing],
        reviews: &HashMap<String, Vec<RawReview>>,
    ) -> Result<()> {
        let dir = self.raw_dir(run_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::VersionWrite(format!("create raw area: {}", e)))?;

        let listings_json = serde_json::to_vec_pretty(listings)?;
        Self::write_atomic(&dir.join("listings.json"), &listings_json)
            .map_err(|e| Error::VersionWrite(format!("write raw listings: {}", e)))?;

        let reviews_json = serde_json::to_vec_pretty(reviews)?;
        Self::write_atomic(&dir.join("reviews.json"), &reviews_json)
            .map_err(|e| Error::VersionWrite(format!("write raw reviews: {}", e)))?;

        tracing::debug!(run_id = %run_id, listings = listings.len(), "Raw inputs captured");
        Ok(())
    }

    async fn put(&self, records: &[EnrichedRecord], run_id: Uuid) -> Result<String> {
        let batch_json = serde_json::to_vec_pretty(records)?;
        let version_id = format!("{:x}", Sha256::digest(&batch_json));

        let dir = self.snapshot_dir(&version_id);
        if dir.join("batch.json").exists() {
            // Append-only: identical content, identical id, nothing rewritten
            tracing::info!(version_id = %version_id, "Snapshot already committed, reusing");
            return Ok(version_id);
        }

        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::VersionWrite(format!("create snapshot dir: {}", e)))?;

        let manifest = SnapshotManifest {
            version_id: version_id.clone(),
            run_id,
            record_count: records.len(),
            created_at: Utc::now(),
        };
        Self::write_atomic(&dir.join("manifest.json"), &serde_json::to_vec_pretty(&manifest)?)
            .map_err(|e| Error::VersionWrite(format!("write manifest: {}", e)))?;
        Self::write_atomic(&dir.join("batch.json"), &batch_json)
            .map_err(|e| Error::VersionWrite(format!("write batch: {}", e)))?;

        tracing::info!(
            version_id = %version_id,
            run_id = %run_id,
            records = records.len(),
            "Snapshot committed"
        );
        Ok(version_id)
    }

    async fn get(&self, version_id: &str) -> Result<Vec<EnrichedRecord>> {
        let path = self.snapshot_dir(version_id).join("batch.json");
        if !path.exists() {
            return Err(Error::NotFound(format!("snapshot {}", version_id)));
        }
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
