//! Per-run state machine and result aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline run states
///
/// Progression: Idle → Collecting → Enriching → Validating → Versioning →
/// Loading → Completed. `Failed` is terminal and reachable from any stage on
/// a stage-fatal error; item-scoped failures never enter this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Collecting,
    Enriching,
    Validating,
    Versioning,
    Loading,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Collecting => "collecting",
            RunState::Enriching => "enriching",
            RunState::Validating => "validating",
            RunState::Versioning => "versioning",
            RunState::Loading => "loading",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Stage in which an item-scoped failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Enrichment,
    Validation,
}

/// One item-scoped failure, recorded without aborting the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: String,
    pub title: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// Aggregated outcome of one orchestrator invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub state: RunState,
    /// Listings fetched from the catalog source
    pub fetched: usize,
    /// Records enriched this run (fresh LLM output)
    pub processed: usize,
    /// Records skipped because their content hash was unchanged
    pub skipped: usize,
    /// Item-scoped failures (enrichment + validation)
    pub failed: usize,
    /// Rows upserted into the warehouse
    pub loaded: usize,
    pub failures: Vec<ItemFailure>,
    /// Version store snapshot id, None when zero net-new records were loaded
    pub snapshot_id: Option<String>,
    /// Stage-fatal error message when the run ended in `Failed`
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunResult {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            fetched: 0,
            processed: 0,
            skipped: 0,
            failed: 0,
            loaded: 0,
            failures: Vec::new(),
            snapshot_id: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record an item-scoped failure
    pub fn record_failure(&mut self, failure: ItemFailure) {
        tracing::warn!(
            id = %failure.id,
            stage = ?failure.stage,
            reason = %failure.reason,
            "Item failed"
        );
        self.failed += 1;
        self.failures.push(failure);
    }

    /// A run that processed 0 of N items successfully still completes; only
    /// stage-fatal errors make it `Failed`.
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Completed
    }
}
