//! Canonical (normalized, hashable) records

use serde::{Deserialize, Serialize};

/// Normalized representation of one media item plus its reviews
///
/// Produced by the preprocessor, consumed by the enrichment client. The
/// `content_hash` covers every normalized input field (never generated
/// fields) and is the idempotency key for re-enrichment: same `id`, same
/// hash means the prior enrichment can be reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Stable identifier, derived deterministically from the external id
    pub id: String,
    pub title: String,
    /// "movie" or "show"
    pub content_type: String,
    /// Ordered, deduplicated, comma-joined platform names
    pub streaming_platforms: String,
    /// Parsed from free-text release date; None when unparsable
    pub release_year: Option<i32>,
    pub release_date_text: String,
    pub detail_url: String,
    /// Ordered, deduplicated, comma-joined source genres
    pub source_genres: String,
    pub imdb_rating: Option<f64>,
    pub rotten_tomatoes_rating: Option<String>,
    pub synopsis: String,
    /// Cast serialized as stable JSON
    pub cast_members: String,
    /// Directors serialized as stable JSON
    pub directors: String,
    pub duration_text: String,
    pub maturity_rating: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    /// Reviews serialized as stable JSON
    pub scraped_reviews: String,
    /// SHA-256 over the canonical ordering of all fields above
    pub content_hash: String,
}
