//! mediavibe-ingest - batch ingestion-enrichment pipeline
//!
//! Invoked once per scheduling period by an external scheduler. Collects
//! newly released media listings and reviews, enriches them with
//! LLM-generated metadata, validates, snapshots, and loads the result into
//! the analytical warehouse. The process exit status reports run
//! success/failure to the caller.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediavibe_common::config::{IngestConfig, TomlConfig};
use mediavibe_ingest::collectors::{HttpCatalogSource, HttpReviewSource, ReviewCollector, ReviewSource};
use mediavibe_ingest::enrich::LlmEnrichmentClient;
use mediavibe_ingest::pipeline::Orchestrator;
use mediavibe_ingest::store::{FsVersionStore, Warehouse};

/// Command-line arguments for mediavibe-ingest
#[derive(Parser, Debug)]
#[command(name = "mediavibe-ingest")]
#[command(about = "Media listings ingestion-enrichment pipeline")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "mediavibe.toml", env = "MEDIAVIBE_CONFIG")]
    config: PathBuf,

    /// Override the lookback window in days
    #[arg(short = 'w', long, env = "MEDIAVIBE_LOOKBACK_DAYS")]
    lookback_days: Option<u32>,

    /// Override the data root for the raw/processed object store
    #[arg(long, env = "MEDIAVIBE_DATA_ROOT")]
    data_root: Option<PathBuf>,

    /// Override the warehouse database path
    #[arg(long, env = "MEDIAVIBE_WAREHOUSE_PATH")]
    warehouse_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediavibe_ingest=info,mediavibe_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting mediavibe-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut toml_config = TomlConfig::load(&args.config)?;
    if let Some(days) = args.lookback_days {
        toml_config.lookback_days = Some(days);
    }
    if let Some(root) = args.data_root {
        toml_config.data_root = Some(root);
    }
    if let Some(path) = args.warehouse_path {
        toml_config.warehouse_path = Some(path);
    }
    let config = IngestConfig::resolve(toml_config)?;

    info!(
        lookback_days = config.lookback_days,
        max_concurrency = config.max_concurrency,
        warehouse = %config.warehouse_path.display(),
        "Configuration resolved"
    );

    // Assemble pipeline components
    let catalog = HttpCatalogSource::new(
        config.catalog_base_url.clone(),
        config.catalog_api_key.clone(),
        config.request_timeout,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create catalog client: {}", e))?;

    let mut review_sources: Vec<Box<dyn ReviewSource>> = Vec::new();
    for url in &config.review_source_urls {
        let source = HttpReviewSource::new(
            url.clone(),
            config.catalog_api_key.clone(),
            config.request_timeout,
        )
        .map_err(|e| anyhow::anyhow!("Failed to create review source {}: {}", url, e))?;
        review_sources.push(Box::new(source));
    }
    let reviews = ReviewCollector::new(review_sources, config.max_reviews_per_source);

    let provider = LlmEnrichmentClient::new(
        config.llm_endpoint.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
        config.request_timeout,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create enrichment client: {}", e))?;

    let version_store = FsVersionStore::new(config.data_root.clone());
    let warehouse = Warehouse::connect(&config.warehouse_path)
        .await
        .context("Failed to open warehouse database")?;
    info!("Warehouse connection established");

    let orchestrator = Orchestrator::new(
        config,
        Box::new(catalog),
        reviews,
        Arc::new(provider),
        Box::new(version_store),
        warehouse,
    );

    // Ctrl-C requests run-level cancellation; in-flight work drains first
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            signal_token.cancel();
        }
    });

    let result = orchestrator.run(cancel_token).await;

    if !result.succeeded() {
        bail!(
            "Run {} failed: {}",
            result.run_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    info!(
        run_id = %result.run_id,
        loaded = result.loaded,
        skipped = result.skipped,
        failed = result.failed,
        "Run completed"
    );
    Ok(())
}
