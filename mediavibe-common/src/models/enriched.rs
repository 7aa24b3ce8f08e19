//! Enriched records (canonical + LLM-generated metadata)

use super::canonical::CanonicalRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// LLM-generated outputs for one record
///
/// The four logical outputs (summary, score, tags, genre) the provider must
/// produce; secondary genres ride along with the primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub summary: String,
    /// Sentiment score, validated to [1,10] at the provider parse boundary
    pub score: f64,
    pub vibe_tags: Vec<String>,
    pub primary_genre: String,
    pub secondary_genres: Vec<String>,
}

/// Canonical record plus enrichment, ready for validation and loading
///
/// Never mutated after creation; reprocessing produces a new record that
/// supersedes the old one by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub canonical: CanonicalRecord,
    pub llm_review_summary: String,
    pub llm_generated_score: f64,
    /// Comma-joined vibe tags
    pub llm_generated_vibe_tags: String,
    pub llm_generated_primary_genre: String,
    /// Comma-joined secondary genres
    pub llm_generated_secondary_genres: String,
    pub data_ingestion_timestamp: DateTime<Utc>,
}

impl EnrichedRecord {
    /// Combine a canonical record with its enrichment
    pub fn new(canonical: CanonicalRecord, enrichment: Enrichment, at: DateTime<Utc>) -> Self {
        Self {
            llm_review_summary: enrichment.summary,
            llm_generated_score: enrichment.score,
            llm_generated_vibe_tags: enrichment.vibe_tags.join(", "),
            llm_generated_primary_genre: enrichment.primary_genre,
            llm_generated_secondary_genres: enrichment.secondary_genres.join(", "),
            data_ingestion_timestamp: at,
            canonical,
        }
    }

    /// Stable identifier (delegates to the canonical record)
    pub fn id(&self) -> &str {
        &self.canonical.id
    }

    /// Originating content hash (delegates to the canonical record)
    pub fn content_hash(&self) -> &str {
        &self.canonical.content_hash
    }
}
