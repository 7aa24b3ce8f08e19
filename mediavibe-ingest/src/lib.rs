//! mediavibe-ingest library interface
//!
//! Batch ingestion-enrichment pipeline for media listings: collect raw
//! listings and reviews, normalize, enrich via an LLM provider, validate,
//! snapshot, and load into the analytical warehouse.

pub mod collectors;
pub mod enrich;
pub mod pipeline;
pub mod preprocess;
pub mod store;
pub mod validate;
