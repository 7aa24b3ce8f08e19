//! Configuration for the MediaVibe ingestion pipeline
//!
//! Resolution priority: environment variables override TOML, TOML overrides
//! built-in defaults. The result is a single `IngestConfig` constructed once
//! at startup and threaded through every component; no component reads
//! ambient environment state mid-run.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk TOML configuration (all fields optional; defaults fill the gaps)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the catalog scraping API
    pub catalog_base_url: Option<String>,
    /// Catalog provider API key
    pub catalog_api_key: Option<String>,
    /// Review source base URLs (each treated as one secondary source)
    pub review_source_urls: Option<Vec<String>>,
    /// LLM provider endpoint (chat-completions style)
    pub llm_endpoint: Option<String>,
    /// LLM provider API key
    pub llm_api_key: Option<String>,
    /// LLM model identifier
    pub llm_model: Option<String>,
    /// Root directory for the raw/processed object store
    pub data_root: Option<PathBuf>,
    /// Path to the warehouse SQLite database
    pub warehouse_path: Option<PathBuf>,
    /// Lookback window in days for the catalog collector
    pub lookback_days: Option<u32>,
    /// Maximum in-flight enrichment calls
    pub max_concurrency: Option<usize>,
    /// Maximum attempts for retryable external calls
    pub max_attempts: Option<u32>,
    /// Initial backoff delay in milliseconds (doubles per attempt)
    pub backoff_base_ms: Option<u64>,
    /// Per-request timeout in seconds for external calls
    pub request_timeout_secs: Option<u64>,
    /// Maximum reviews collected per secondary source
    pub max_reviews_per_source: Option<usize>,
}

impl TomlConfig {
    /// Load TOML configuration from a file, or defaults if the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No TOML config found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }
}

/// Fully resolved pipeline configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub catalog_base_url: String,
    pub catalog_api_key: String,
    pub review_source_urls: Vec<String>,
    pub llm_endpoint: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub data_root: PathBuf,
    pub warehouse_path: PathBuf,
    pub lookback_days: u32,
    pub max_concurrency: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub request_timeout: Duration,
    pub max_reviews_per_source: usize,
}

impl IngestConfig {
    /// Resolve configuration from a TOML layer plus environment overrides
    ///
    /// API keys may come from `MEDIAVIBE_CATALOG_API_KEY` /
    /// `MEDIAVIBE_LLM_API_KEY`; environment takes priority over TOML.
    pub fn resolve(toml: TomlConfig) -> Result<Self> {
        let catalog_api_key = env_override("MEDIAVIBE_CATALOG_API_KEY", toml.catalog_api_key)
            .ok_or_else(|| {
                Error::Config(
                    "Catalog API key not configured. Set MEDIAVIBE_CATALOG_API_KEY or \
                     catalog_api_key in the TOML config."
                        .to_string(),
                )
            })?;
        let llm_api_key =
            env_override("MEDIAVIBE_LLM_API_KEY", toml.llm_api_key).ok_or_else(|| {
                Error::Config(
                    "LLM API key not configured. Set MEDIAVIBE_LLM_API_KEY or \
                     llm_api_key in the TOML config."
                        .to_string(),
                )
            })?;

        let config = Self {
            catalog_base_url: toml
                .catalog_base_url
                .unwrap_or_else(|| "https://api.firecrawl.dev/v1".to_string()),
            catalog_api_key,
            review_source_urls: toml.review_source_urls.unwrap_or_default(),
            llm_endpoint: toml
                .llm_endpoint
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string()),
            llm_api_key,
            llm_model: toml.llm_model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            data_root: toml.data_root.unwrap_or_else(|| PathBuf::from("data")),
            warehouse_path: toml
                .warehouse_path
                .unwrap_or_else(|| PathBuf::from("data/warehouse.db")),
            lookback_days: toml.lookback_days.unwrap_or(7),
            max_concurrency: toml.max_concurrency.unwrap_or(4),
            max_attempts: toml.max_attempts.unwrap_or(3),
            backoff_base_ms: toml.backoff_base_ms.unwrap_or(500),
            request_timeout: Duration::from_secs(toml.request_timeout_secs.unwrap_or(30)),
            max_reviews_per_source: toml.max_reviews_per_source.unwrap_or(3),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.lookback_days == 0 {
            return Err(Error::Config("lookback_days must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn env_override(var: &str, toml_value: Option<String>) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => toml_value.filter(|v| !v.trim().is_empty()),
    }
}
