//! Validator for enriched records
//!
//! Every rule must pass for acceptance. Rejection is item-scoped and
//! non-fatal to the run: rejected records are reported with a reason and
//! accepted records proceed. The ingestion timestamp is enforced by the
//! type system (`DateTime<Utc>` cannot be absent or unparsable).

use mediavibe_common::models::EnrichedRecord;

const SCORE_MIN: f64 = 1.0;
const SCORE_MAX: f64 = 10.0;

/// Outcome of validating one batch
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub accepted: Vec<EnrichedRecord>,
    pub rejected: Vec<(EnrichedRecord, String)>,
}

/// Split a batch into accepted records and rejected (record, reason) pairs
pub fn validate(records: Vec<EnrichedRecord>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for record in records {
        match check(&record) {
            Ok(()) => outcome.accepted.push(record),
            Err(reason) => {
                tracing::warn!(id = %record.id(), reason = %reason, "Record rejected");
                outcome.rejected.push((record, reason));
            }
        }
    }
    outcome
}

fn check(record: &EnrichedRecord) -> Result<(), String> {
    require_non_empty("id", &record.canonical.id)?;
    require_non_empty("title", &record.canonical.title)?;
    require_non_empty("content_type", &record.canonical.content_type)?;
    require_non_empty("synopsis", &record.canonical.synopsis)?;
    require_non_empty("llm_review_summary", &record.llm_review_summary)?;
    require_non_empty("llm_generated_primary_genre", &record.llm_generated_primary_genre)?;

    if !(SCORE_MIN..=SCORE_MAX).contains(&record.llm_generated_score) {
        return Err(format!(
            "score out of range: {} not in [1,10]",
            record.llm_generated_score
        ));
    }

    require_well_formed_list("streaming_platforms", &record.canonical.streaming_platforms)?;
    require_well_formed_list("source_genres", &record.canonical.source_genres)?;
    require_well_formed_list("llm_generated_vibe_tags", &record.llm_generated_vibe_tags)?;
    require_well_formed_list(
        "llm_generated_secondary_genres",
        &record.llm_generated_secondary_genres,
    )?;

    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is empty", field))
    } else {
        Ok(())
    }
}

/// A delimited list is well-formed when empty or free of empty segments
fn require_well_formed_list(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.split(',').any(|segment| segment.trim().is_empty()) {
        Err(format!("{} contains empty segments: {:?}", field, value))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediavibe_common::models::{CanonicalRecord, Enrichment};

    fn canonical() -> CanonicalRecord {
        CanonicalRecord {
            id: "tmdb123".to_string(),
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
            content_hash: "hash".to_string(),
        }
    }

    fn enriched() -> EnrichedRecord {
        EnrichedRecord::new(
            canonical(),
            Enrichment {
                summary: "Great movie!".to_string(),
                score: 8.5,
                vibe_tags: vec!["exciting".to_string(), "fun".to_string()],
                primary_genre: "Action".to_string(),
                secondary_genres: vec![],
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_valid_record_accepted() {
        let outcome = validate(vec![enriched()]);
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let mut record = enriched();
        record.llm_generated_score = 15.0;
        let outcome = validate(vec![record]);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].1.contains("score out of range"));
    }

    #[test]
    fn test_empty_summary_rejected() {
        let mut record = enriched();
        record.llm_review_summary = "  ".to_string();
        let outcome = validate(vec![record]);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].1.contains("llm_review_summary"));
    }

    #[test]
    fn test_empty_synopsis_rejected() {
        let mut record = enriched();
        record.canonical.synopsis = String::new();
        let outcome = validate(vec![record]);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_malformed_list_rejected() {
        let mut record = enriched();
        record.canonical.streaming_platforms = "Netflix, , Hulu".to_string();
        let outcome = validate(vec![record]);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].1.contains("streaming_platforms"));
    }

    #[test]
    fn test_empty_list_is_well_formed() {
        let mut record = enriched();
        record.llm_generated_secondary_genres = String::new();
        let outcome = validate(vec![record]);
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn test_mixed_batch_split() {
        let good = enriched();
        let mut bad = enriched();
        bad.llm_generated_score = 0.0;
        let outcome = validate(vec![good, bad]);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_boundary_scores_accepted() {
        let mut low = enriched();
        low.llm_generated_score = 1.0;
        let mut high = enriched();
        high.llm_generated_score = 10.0;
        let outcome = validate(vec![low, high]);
        assert_eq!(outcome.accepted.len(), 2);
    }
}
