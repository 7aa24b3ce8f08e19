//! Data models for the ingestion pipeline
//!
//! Records move through three representations: raw (as fetched from the
//! catalog and review sources, ephemeral), canonical (normalized and
//! content-hashed, the unit of work), and enriched (canonical plus
//! LLM-generated fields, the unit of versioning and loading).

pub mod canonical;
pub mod enriched;
pub mod raw;
pub mod run;

pub use canonical::CanonicalRecord;
pub use enriched::{EnrichedRecord, Enrichment};
pub use raw::{CastMember, RawListing, RawReview};
pub use run::{FailureStage, ItemFailure, RunResult, RunState};
