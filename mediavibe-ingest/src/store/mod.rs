//! Stateful stores: the content-addressed version store and the warehouse
//!
//! These are the only externally visible stateful resources in the
//! pipeline; a single orchestrator run owns both for its duration.

pub mod version;
pub mod warehouse;

pub use version::{FsVersionStore, VersionStore};
pub use warehouse::Warehouse;
