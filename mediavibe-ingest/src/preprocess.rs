//! Preprocessor: raw listing + reviews → canonical record
//!
//! Pure and deterministic: no I/O, no clock, no randomness. Byte-identical
//! raw input always yields the same `content_hash`, which downstream stages
//! use as the idempotency key for re-enrichment.

use mediavibe_common::models::{CanonicalRecord, RawListing, RawReview};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap())
}

/// Strip markup and collapse runs of whitespace into single spaces
pub fn clean_text(input: &str) -> String {
    let stripped = tag_re().replace_all(input, " ");
    ws_re().replace_all(&stripped, " ").trim().to_string()
}

/// Parse a four-digit release year out of free-text date, None if unparsable
pub fn parse_release_year(date_text: &str) -> Option<i32> {
    year_re()
        .find(date_text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Normalize a multi-valued field: clean each entry, drop empties, dedup
/// preserving first-seen order, join with ", "
pub fn join_multi(values: &[String]) -> String {
    let mut seen = Vec::new();
    for value in values {
        let cleaned = clean_text(value);
        if !cleaned.is_empty() && !seen.contains(&cleaned) {
            seen.push(cleaned);
        }
    }
    seen.join(", ")
}

/// Normalize content type to "movie" or "show"
fn normalize_content_type(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains("tv") || lowered.contains("show") || lowered.contains("series") {
        "show".to_string()
    } else {
        "movie".to_string()
    }
}

/// Parse a leading float out of a rating string ("8.5", "8.5/10")
fn parse_rating(raw: &Option<String>) -> Option<f64> {
    let text = raw.as_deref()?.trim();
    let numeric: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().ok()
}

/// Derive the stable record id
///
/// The external id is used verbatim when the source provides one. Otherwise
/// the id is a deterministic digest prefix of the detail URL (or title plus
/// release date as a last resort), so re-runs regenerate the same id.
fn stable_id(listing: &RawListing) -> String {
    if let Some(id) = listing.external_id.as_deref() {
        let trimmed = id.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let seed = match listing.detail_url.as_deref() {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => format!(
            "{}|{}",
            listing.title.trim(),
            listing.release_date.as_deref().unwrap_or("")
        ),
    };
    let digest = format!("{:x}", Sha256::digest(seed.as_bytes()));
    format!("mv-{}", &digest[..16])
}

/// Normalize one listing and its reviews into a canonical record
pub fn normalize(listing: &RawListing, reviews: &[RawReview]) -> CanonicalRecord {
    let cleaned_reviews: Vec<RawReview> = reviews
        .iter()
        .filter(|r| !r.review_text.trim().is_empty())
        .map(|r| RawReview {
            source_name: clean_text(&r.source_name),
            review_text: clean_text(&r.review_text),
            original_score: r.original_score.as_deref().map(clean_text),
            review_url: r.review_url.clone(),
        })
        .collect();

    let cleaned_cast: Vec<_> = listing
        .cast
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| mediavibe_common::models::CastMember {
            name: clean_text(&c.name),
            character: c.character.as_deref().map(clean_text),
        })
        .collect();

    let directors: Vec<String> = {
        let joined = join_multi(&listing.directors);
        if joined.is_empty() {
            Vec::new()
        } else {
            joined.split(", ").map(str::to_string).collect()
        }
    };

    // Struct field order is fixed, so serde_json output is stable
    let scraped_reviews =
        serde_json::to_string(&cleaned_reviews).unwrap_or_else(|_| "[]".to_string());
    let cast_members = serde_json::to_string(&cleaned_cast).unwrap_or_else(|_| "[]".to_string());
    let directors_json = serde_json::to_string(&directors).unwrap_or_else(|_| "[]".to_string());

    let release_date_text = listing
        .release_date
        .as_deref()
        .map(clean_text)
        .unwrap_or_default();

    let mut record = CanonicalRecord {
        id: stable_id(listing),
        title: clean_text(&listing.title),
        content_type: normalize_content_type(&listing.content_type),
        streaming_platforms: join_multi(&listing.streaming_platforms),
        release_year: parse_release_year(&release_date_text),
        release_date_text,
        detail_url: listing.detail_url.as_deref().map(clean_text).unwrap_or_default(),
        source_genres: join_multi(&listing.genres),
        imdb_rating: parse_rating(&listing.imdb_rating),
        rotten_tomatoes_rating: listing
            .rotten_tomatoes_rating
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty()),
        synopsis: listing.synopsis.as_deref().map(clean_text).unwrap_or_default(),
        cast_members,
        directors: directors_json,
        duration_text: listing.duration.as_deref().map(clean_text).unwrap_or_default(),
        maturity_rating: listing
            .maturity_rating
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty()),
        language: listing
            .language
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty()),
        country: listing
            .country
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty()),
        scraped_reviews,
        content_hash: String::new(),
    };
    record.content_hash = content_hash(&record);
    record
}

/// SHA-256 digest over the canonical ordering of all normalized input fields
///
/// Generated (LLM) fields never participate. Fields are joined with a unit
/// separator so adjacent values cannot collide.
pub fn content_hash(record: &CanonicalRecord) -> String {
    let mut hasher = Sha256::new();
    let release_year = record
        .release_year
        .map(|y| y.to_string())
        .unwrap_or_default();
    let imdb_rating = record
        .imdb_rating
        .map(|r| format!("{:.3}", r))
        .unwrap_or_default();
    let fields: [&str; 18] = [
        &record.id,
        &record.title,
        &record.content_type,
        &record.streaming_platforms,
        &release_year,
        &record.release_date_text,
        &record.detail_url,
        &record.source_genres,
        &imdb_rating,
        record.rotten_tomatoes_rating.as_deref().unwrap_or(""),
        &record.synopsis,
        &record.cast_members,
        &record.directors,
        &record.duration_text,
        record.maturity_rating.as_deref().unwrap_or(""),
        record.language.as_deref().unwrap_or(""),
        record.country.as_deref().unwrap_or(""),
        &record.scraped_reviews,
    ];
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}
