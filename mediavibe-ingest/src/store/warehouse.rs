//! Warehouse access: the `movies_tv_shows_enriched` analytical table
//!
//! Upsert semantics keyed by `id`: an existing row is replaced in place
//! (every column overwritten), an absent row is inserted. Loads are
//! all-or-nothing per run inside one transaction, which together with the
//! upsert makes whole-batch retries safe.

use chrono::{DateTime, Utc};
use mediavibe_common::models::{CanonicalRecord, EnrichedRecord};
use mediavibe_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Warehouse handle over a SQLite pool
#[derive(Clone)]
pub struct Warehouse {
    pool: SqlitePool,
}

impl Warehouse {
    /// Open (or create) the warehouse database and initialize the schema
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to warehouse: {}", db_url);
        let pool = SqlitePool::connect(&db_url).await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool (tests use `sqlite::memory:`)
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Upsert a batch as a single all-or-nothing unit
    ///
    /// Any row failure rolls back the whole batch and surfaces
    /// `Error::Load`; the caller may retry the full batch safely.
    pub async fn load(&self, records: &[EnrichedRecord]) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Load(e.to_string()))?;

        for record in records {
            upsert_row(&mut tx, record)
                .await
                .map_err(|e| Error::Load(format!("row {}: {}", record.id(), e)))?;
        }

        tx.commit().await.map_err(|e| Error::Load(e.to_string()))?;

        tracing::info!(rows = records.len(), "Warehouse load committed");
        Ok(records.len())
    }

    /// Load the stored enriched record for an id
    ///
    /// The orchestrator reads this before enriching: an unchanged content
    /// hash means the stored enrichment is reused and the item is skipped.
    pub async fn load_enriched(&self, id: &str) -> Result<Option<EnrichedRecord>> {
        let row = sqlx::query("SELECT * FROM movies_tv_shows_enriched WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_record).transpose()
    }

    /// Current number of warehouse rows
    pub async fn row_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM movies_tv_shows_enriched")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movies_tv_shows_enriched (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content_type TEXT NOT NULL,
            streaming_platforms TEXT NOT NULL DEFAULT '',
            release_year INTEGER,
            release_date_text TEXT NOT NULL DEFAULT '',
            detail_url TEXT NOT NULL DEFAULT '',
            source_genres TEXT NOT NULL DEFAULT '',
            imdb_rating REAL,
            rotten_tomatoes_rating TEXT,
            synopsis TEXT NOT NULL DEFAULT '',
            cast_members TEXT NOT NULL DEFAULT '[]',
            directors TEXT NOT NULL DEFAULT '[]',
            duration_text TEXT NOT NULL DEFAULT '',
            maturity_rating TEXT,
            language TEXT,
            country TEXT,
            scraped_reviews TEXT NOT NULL DEFAULT '[]',
            llm_review_summary TEXT NOT NULL,
            llm_generated_score REAL NOT NULL,
            llm_generated_vibe_tags TEXT NOT NULL DEFAULT '',
            llm_generated_primary_genre TEXT NOT NULL,
            llm_generated_secondary_genres TEXT NOT NULL DEFAULT '',
            data_ingestion_timestamp TEXT NOT NULL,
            source_data_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    record: &EnrichedRecord,
) -> std::result::Result<(), sqlx::Error> {
    let c = &record.canonical;
    sqlx::query(
        r#"
        INSERT INTO movies_tv_shows_enriched (
            id, title, content_type, streaming_platforms, release_year,
            release_date_text, detail_url, source_genres, imdb_rating,
            rotten_tomatoes_rating, synopsis, cast_members, directors,
            duration_text, maturity_rating, language, country,
            scraped_reviews, llm_review_summary, llm_generated_score,
            llm_generated_vibe_tags, llm_generated_primary_genre,
            llm_generated_secondary_genres, data_ingestion_timestamp,
            source_data_hash
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content_type = excluded.content_type,
            streaming_platforms = excluded.streaming_platforms,
            release_year = excluded.release_year,
            release_date_text = excluded.release_date_text,
            detail_url = excluded.detail_url,
            source_genres = excluded.source_genres,
            imdb_rating = excluded.imdb_rating,
            rotten_tomatoes_rating = excluded.rotten_tomatoes_rating,
            synopsis = excluded.synopsis,
            cast_members = excluded.cast_members,
            directors = excluded.directors,
            duration_text = excluded.duration_text,
            maturity_rating = excluded.maturity_rating,
            language = excluded.language,
            country = excluded.country,
            scraped_reviews = excluded.scraped_reviews,
            llm_review_summary = excluded.llm_review_summary,
            llm_generated_score = excluded.llm_generated_score,
            llm_generated_vibe_tags = excluded.llm_generated_vibe_tags,
            llm_generated_primary_genre = excluded.llm_generated_primary_genre,
            llm_generated_secondary_genres = excluded.llm_generated_secondary_genres,
            data_ingestion_timestamp = excluded.data_ingestion_timestamp,
            source_data_hash = excluded.source_data_hash
        "#,
    )
    .bind(&c.id)
    .bind(&c.title)
    .bind(&c.content_type)
    .bind(&c.streaming_platforms)
    .bind(c.release_year)
    .bind(&c.release_date_text)
    .bind(&c.detail_url)
    .bind(&c.source_genres)
    .bind(c.imdb_rating)
    .bind(&c.rotten_tomatoes_rating)
    .bind(&c.synopsis)
    .bind(&c.cast_members)
    .bind(&c.directors)
    .bind(&c.duration_text)
    .bind(&c.maturity_rating)
    .bind(&c.language)
    .bind(&c.country)
    .bind(&c.scraped_reviews)
    .bind(&record.llm_review_summary)
    .bind(record.llm_generated_score)
    .bind(&record.llm_generated_vibe_tags)
    .bind(&record.llm_generated_primary_genre)
    .bind(&record.llm_generated_secondary_genres)
    .bind(record.data_ingestion_timestamp.to_rfc3339())
    .bind(record.content_hash())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<EnrichedRecord> {
    let timestamp_text: String = row.get("data_ingestion_timestamp");
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_text)
        .map_err(|e| Error::Load(format!("bad timestamp in warehouse row: {}", e)))?
        .with_timezone(&Utc);

    Ok(EnrichedRecord {
        canonical: CanonicalRecord {
            id: row.get("id"),
            title: row.get("title"),
            content_type: row.get("content_type"),
            streaming_platforms: row.get("streaming_platforms"),
            release_year: row.get("release_year"),
            release_date_text: row.get("release_date_text"),
            detail_url: row.get("detail_url"),
            source_genres: row.get("source_genres"),
            imdb_rating: row.get("imdb_rating"),
            rotten_tomatoes_rating: row.get("rotten_tomatoes_rating"),
            synopsis: row.get("synopsis"),
            cast_members: row.get("cast_members"),
            directors: row.get("directors"),
            duration_text: row.get("duration_text"),
            maturity_rating: row.get("maturity_rating"),
            language: row.get("language"),
            country: row.get("country"),
            scraped_reviews: row.get("scraped_reviews"),
            content_hash: row.get("source_data_hash"),
        },
        llm_review_summary: row.get("llm_review_summary"),
        llm_generated_score: row.get("llm_generated_score"),
        llm_generated_vibe_tags: row.get("llm_generated_vibe_tags"),
        llm_generated_primary_genre: row.get("llm_generated_primary_genre"),
        llm_generated_secondary_genres: row.get("llm_generated_secondary_genres"),
        data_ingestion_timestamp: timestamp,
    })
}
