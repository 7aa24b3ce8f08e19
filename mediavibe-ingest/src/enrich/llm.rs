//! LLM enrichment client
//!
//! One chat-completions call per record produces all four logical outputs
//! (summary, score, tags, genre) as a single JSON object. Parsing is strict:
//! missing fields, a non-numeric score, or a score outside [1,10] fail the
//! item as malformed rather than being clamped.

use super::{EnrichError, EnrichmentProvider};
use async_trait::async_trait;
use mediavibe_common::models::{CanonicalRecord, Enrichment};
use serde::Deserialize;
use std::time::Duration;

const SCORE_MIN: f64 = 1.0;
const SCORE_MAX: f64 = 10.0;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// The JSON object the model is instructed to emit
#[derive(Debug, Deserialize)]
struct LlmPayload {
    summary: String,
    vibe_score: serde_json::Value,
    vibe_tags: Vec<String>,
    primary_genre: String,
    #[serde(default)]
    secondary_genres: Vec<String>,
}

/// Chat-completions backed enrichment provider
pub struct LlmEnrichmentClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmEnrichmentClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, EnrichError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
            model,
        })
    }

    fn build_prompt(record: &CanonicalRecord) -> String {
        format!(
            "You are rating newly released media for a recommendation catalog.\n\
             Title: {title}\n\
             Type: {content_type}\n\
             Source genres: {genres}\n\
             Synopsis: {synopsis}\n\
             Reviews (JSON): {reviews}\n\n\
             Respond with a single JSON object with exactly these fields:\n\
             - \"summary\": one-paragraph synthesis of the reviews (or the synopsis if no reviews)\n\
             - \"vibe_score\": overall vibe as a number between 1 and 10\n\
             - \"vibe_tags\": 2-5 short lowercase descriptive tags\n\
             - \"primary_genre\": the single best-fitting genre\n\
             - \"secondary_genres\": other applicable genres, possibly empty",
            title = record.title,
            content_type = record.content_type,
            genres = record.source_genres,
            synopsis = record.synopsis,
            reviews = record.scraped_reviews,
        )
    }

    /// Strict score parsing: numeric (or numeric string) and within [1,10]
    fn parse_score(value: &serde_json::Value) -> Result<f64, EnrichError> {
        let score = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| EnrichError::Malformed(format!("vibe_score not numeric: {}", value)))?;

        if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            return Err(EnrichError::Malformed(format!(
                "vibe_score out of range [1,10]: {}",
                score
            )));
        }
        Ok(score)
    }

    fn parse_payload(content: &str) -> Result<Enrichment, EnrichError> {
        let payload: LlmPayload = serde_json::from_str(content)
            .map_err(|e| EnrichError::Malformed(format!("response not valid JSON: {}", e)))?;

        let score = Self::parse_score(&payload.vibe_score)?;
        if payload.summary.trim().is_empty() {
            return Err(EnrichError::Malformed("empty summary".to_string()));
        }
        if payload.primary_genre.trim().is_empty() {
            return Err(EnrichError::Malformed("empty primary_genre".to_string()));
        }

        Ok(Enrichment {
            summary: payload.summary.trim().to_string(),
            score,
            vibe_tags: payload
                .vibe_tags
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            primary_genre: payload.primary_genre.trim().to_string(),
            secondary_genres: payload
                .secondary_genres
                .into_iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
        })
    }
}

#[async_trait]
impl EnrichmentProvider for LlmEnrichmentClient {
    async fn enrich(&self, record: &CanonicalRecord) -> Result<Enrichment, EnrichError> {
        tracing::debug!(id = %record.id, title = %record.title, "Requesting enrichment");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": Self::build_prompt(record)}],
                "response_format": {"type": "json_object"},
                "temperature": 0.2,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichError::Timeout
                } else {
                    EnrichError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EnrichError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Malformed(format!("unexpected response shape: {}", e)))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| EnrichError::Malformed("no choices in response".to_string()))?;

        let enrichment = Self::parse_payload(content)?;

        tracing::info!(
            id = %record.id,
            score = enrichment.score,
            genre = %enrichment.primary_genre,
            "Record enriched"
        );

        Ok(enrichment)
    }
}
