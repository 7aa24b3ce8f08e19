//! Source and review collectors
//!
//! External sources sit behind traits so tests can inject fakes without
//! touching component logic. The catalog source is a hard dependency of a
//! run; review sources are best-effort enrichment input.

pub mod catalog;
pub mod reviews;

pub use catalog::{CatalogError, HttpCatalogSource};
pub use reviews::{HttpReviewSource, ReviewCollector};

use async_trait::async_trait;
use mediavibe_common::models::{RawListing, RawReview};

/// Listings fetched from the catalog for one window
#[derive(Debug, Clone, Default)]
pub struct CollectedListings {
    pub listings: Vec<RawListing>,
    /// False when pagination failed partway and the batch is a prefix of the
    /// full result. The orchestrator logs and proceeds.
    pub complete: bool,
}

/// Catalog of newly released listings
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch listings released within the last `window_days` days
    ///
    /// An error here means nothing could be fetched this attempt; partial
    /// pagination results come back as `Ok` with `complete: false`.
    async fn collect(&self, window_days: u32) -> Result<CollectedListings, CatalogError>;
}

/// One secondary source of review text
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Human-readable source name for logging
    fn name(&self) -> &str;

    /// Fetch up to `limit` reviews for a listing
    async fn collect(
        &self,
        listing: &RawListing,
        limit: usize,
    ) -> Result<Vec<RawReview>, reviews::ReviewError>;
}
