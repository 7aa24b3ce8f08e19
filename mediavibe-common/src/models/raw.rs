//! Raw source-provided records
//!
//! Field names mirror the catalog API's camelCase JSON. Raw records are
//! immutable once fetched and are discarded after preprocessing.

use serde::{Deserialize, Serialize};

/// One listing as returned by the catalog source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListing {
    /// Source identifier; derived from the detail URL when the source omits it
    pub external_id: Option<String>,
    pub title: String,
    /// "movie" or "TV show" (free text at this layer)
    pub content_type: String,
    pub streaming_platforms: Vec<String>,
    /// Free-text release date ("2025-01-01", "Jan 1, 2025", ...)
    pub release_date: Option<String>,
    pub detail_url: Option<String>,
    pub genres: Vec<String>,
    pub imdb_rating: Option<String>,
    pub rotten_tomatoes_rating: Option<String>,
    pub synopsis: Option<String>,
    pub cast: Vec<CastMember>,
    pub directors: Vec<String>,
    pub duration: Option<String>,
    pub maturity_rating: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
}

/// Cast member with optional character name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
}

/// One review scraped from a secondary source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReview {
    /// Reviewer or site name
    pub source_name: String,
    pub review_text: String,
    /// Score as printed by the source ("4/5", "87%"), kept verbatim
    pub original_score: Option<String>,
    pub review_url: Option<String>,
}
