//! Scheduled-import data structures.
//!
//! Defines the schedule definition, the history entry recorded for every
//! execution attempt, and the aggregate statistics shape consumed by the
//! admin dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::import::{ImportOptions, ImportResult};

// ============================================================================
// ScheduledImport
// ============================================================================

/// A named, recurring definition of when and how to run a bulk card import.
///
/// Lives for the process lifetime only; definitions are not persisted across
/// restarts. `last_run`, `next_run`, and `last_result` are mutated solely by
/// the scheduler core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledImport {
    /// Stable identity, used for lookup, enable/disable, and removal.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// Five-field cron expression; only minute and hour are honored.
    pub cron_expression: String,
    /// Options passed through to the import collaborator.
    #[serde(default)]
    pub options: ImportOptions,
    /// Whether the schedule is armed.
    pub enabled: bool,
    /// When the schedule last executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// When the schedule will next fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    /// Result of the most recent run, overwritten each time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<ImportResult>,
}

impl ScheduledImport {
    /// Create an enabled definition with default options.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cron_expression: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cron_expression: cron_expression.into(),
            options: ImportOptions::default(),
            enabled: true,
            last_run: None,
            next_run: None,
            last_result: None,
        }
    }

    /// The ephemeral definition used for ad-hoc manual imports.
    ///
    /// Never enters the registry and never schedules anything.
    pub(crate) fn ad_hoc(options: ImportOptions) -> Self {
        Self {
            id: "manual-import".to_string(),
            name: "Manual import".to_string(),
            cron_expression: String::new(),
            options,
            enabled: false,
            last_run: None,
            next_run: None,
            last_result: None,
        }
    }
}

// ============================================================================
// Import History
// ============================================================================

/// What initiated an execution attempt. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    /// Fired by an armed timer.
    Schedule,
    /// Explicit invocation, including manual runs of a registered schedule.
    Manual,
    /// Reserved for the HTTP layer; nothing in this crate produces it.
    Api,
}

/// Status of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    /// Execution in progress.
    Running,
    /// The import call resolved (inspect the result for partial failures).
    Completed,
    /// The import call errored or the feature flag was off.
    Failed,
    /// Reserved terminal state; no code path currently produces it.
    Cancelled,
}

impl HistoryStatus {
    /// Whether the entry can no longer change.
    pub fn is_terminal(self) -> bool {
        !matches!(self, HistoryStatus::Running)
    }
}

/// Record of a single execution attempt, immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHistoryEntry {
    /// Unique, time-ordered id.
    pub id: String,
    /// The definition that spawned this run, absent for ad-hoc manual runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_import_id: Option<String>,
    /// When the attempt started.
    pub start_time: DateTime<Utc>,
    /// When the attempt finished; unset while running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: HistoryStatus,
    /// Provenance of the run.
    pub triggered_by: TriggeredBy,
    /// The import result once execution finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResult>,
}

impl ImportHistoryEntry {
    /// Generate a history id: ULIDs are millisecond-ordered with a random
    /// suffix, so rapid successive triggers cannot collide.
    pub fn generate_id() -> String {
        format!("run_{}", ulid::Ulid::new())
    }

    /// Open a new `running` entry starting now.
    pub(crate) fn open(
        scheduled_import_id: Option<String>,
        triggered_by: TriggeredBy,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            scheduled_import_id,
            start_time,
            end_time: None,
            status: HistoryStatus::Running,
            triggered_by,
            result: None,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Aggregate scheduler state for dashboards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStatistics {
    /// Registered schedule definitions.
    pub total_schedules: usize,
    /// Definitions currently enabled.
    pub enabled_schedules: usize,
    /// Definitions currently disabled.
    pub disabled_schedules: usize,
    /// History entries of any status.
    pub total_runs: usize,
    /// Runs that completed.
    pub successful_runs: usize,
    /// Runs that failed.
    pub failed_runs: usize,
    /// Runs still in flight.
    pub running_runs: usize,
    /// Most recent run across all schedules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// Earliest upcoming run across enabled schedules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

// ============================================================================
// Tests
// ============================================================================
