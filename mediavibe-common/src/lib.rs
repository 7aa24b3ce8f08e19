//! # MediaVibe Common Library
//!
//! Shared code for the MediaVibe ingestion pipeline:
//! - Error types
//! - Configuration loading
//! - Data models (raw, canonical, enriched, run results)

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
