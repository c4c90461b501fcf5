//! In-memory import history log.
//!
//! An append-only log of execution attempts, ordered by start time. Entries
//! open in `running` state and are closed exactly once with a terminal
//! status; once terminal they are never mutated. Retention is unbounded
//! except for the explicit prune-by-age operation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::import::ImportResult;

use super::schedule::{HistoryStatus, ImportHistoryEntry, TriggeredBy};

/// Run counts derived from the log, for statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub running: usize,
}

/// Shared handle to the history log.
#[derive(Clone, Default)]
pub struct HistoryLog {
    inner: Arc<RwLock<Vec<ImportHistoryEntry>>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a `running` entry for a new execution attempt and return it.
    ///
    /// The start time is assigned under the log's write lock, so append
    /// order and start-time order are the same ordering even when
    /// executions race to record themselves.
    pub async fn open(
        &self,
        scheduled_import_id: Option<String>,
        triggered_by: TriggeredBy,
    ) -> ImportHistoryEntry {
        let mut inner = self.inner.write().await;
        let entry = ImportHistoryEntry::open(scheduled_import_id, triggered_by, Utc::now());
        debug!(
            history_id = %entry.id,
            triggered_by = ?triggered_by,
            "import run started"
        );
        inner.push(entry.clone());
        entry
    }

    /// Close a running entry with a terminal status and its result.
    ///
    /// Returns `false` when the id is unknown or the entry already reached a
    /// terminal state; terminal entries are never touched again.
    pub async fn close(
        &self,
        id: &str,
        status: HistoryStatus,
        result: ImportResult,
        end_time: DateTime<Utc>,
    ) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.iter_mut().find(|e| e.id == id) else {
            warn!(history_id = %id, "attempted to close unknown history entry");
            return false;
        };
        if entry.status.is_terminal() {
            warn!(history_id = %id, status = ?entry.status, "history entry already closed");
            return false;
        }
        entry.status = status;
        entry.end_time = Some(end_time);
        entry.result = Some(result);
        debug!(history_id = %id, status = ?status, "import run finished");
        true
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ImportHistoryEntry> {
        let inner = self.inner.read().await;
        inner.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent entries for one scheduled import, newest first.
    pub async fn recent_for(&self, scheduled_import_id: &str, limit: usize) -> Vec<ImportHistoryEntry> {
        let inner = self.inner.read().await;
        inner
            .iter()
            .rev()
            .filter(|e| e.scheduled_import_id.as_deref() == Some(scheduled_import_id))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Delete entries that started strictly before `days_to_keep` days ago.
    /// Returns the number removed.
    pub async fn prune_older_than(&self, days_to_keep: i64) -> usize {
        self.prune_before(Utc::now() - Duration::days(days_to_keep))
            .await
    }

    /// Delete entries with `start_time` strictly before the cutoff.
    pub(crate) async fn prune_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|e| e.start_time >= cutoff);
        let removed = before - inner.len();
        if removed > 0 {
            debug!(removed, kept = inner.len(), "pruned import history");
        }
        removed
    }

    /// Aggregate counts by status.
    pub async fn counts(&self) -> HistoryCounts {
        let inner = self.inner.read().await;
        let mut counts = HistoryCounts {
            total: inner.len(),
            ..Default::default()
        };
        for entry in inner.iter() {
            match entry.status {
                HistoryStatus::Completed => counts.completed += 1,
                HistoryStatus::Failed => counts.failed += 1,
                HistoryStatus::Running => counts.running += 1,
                HistoryStatus::Cancelled => {}
            }
        }
        counts
    }

    /// Append a pre-built entry, bypassing timestamping. Tests only.
    #[cfg(test)]
    pub(crate) async fn push(&self, entry: ImportHistoryEntry) {
        self.inner.write().await.push(entry);
    }
}
