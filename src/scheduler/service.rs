//! Import scheduler service.
//!
//! Arms a single-shot timer per scheduled import, executes imports when
//! timers fire or callers trigger them, and records every attempt in the
//! history log. Constructed once by the application's composition root and
//! handed to whatever needs it; call [`ImportScheduler::shutdown`] before
//! process exit so no armed timers keep the runtime alive.
//!
//! Concurrency model: all state lives behind async locks touched only
//! between await points; there is intentionally no in-flight guard, so a
//! manual run can overlap a timer fire for the same id and the definition's
//! run state is last-writer-wins. Duplicate imports across multiple process
//! instances are likewise not prevented.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ImportSchedulerConfig;
use crate::import::{DataImportService, ImportOptions, ImportResult};

use super::cron;
use super::error::{Result, SchedulerError};
use super::history::HistoryLog;
use super::registry::ImportRegistry;
use super::schedule::{
    HistoryStatus, ImportHistoryEntry, ImportStatistics, ScheduledImport, TriggeredBy,
};

/// Id of the default daily import seeded at startup.
pub const DEFAULT_IMPORT_ID: &str = "daily-card-import";

struct SchedulerInner {
    importer: Arc<dyn DataImportService>,
    registry: ImportRegistry,
    history: HistoryLog,
    /// Cancel handles for armed timers, at most one per schedule id.
    timers: RwLock<HashMap<String, oneshot::Sender<()>>>,
}

/// Handle to the import scheduler. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ImportScheduler {
    inner: Arc<SchedulerInner>,
}

impl ImportScheduler {
    /// Create a scheduler with no registered definitions.
    pub fn new(importer: Arc<dyn DataImportService>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                importer,
                registry: ImportRegistry::new(),
                history: HistoryLog::new(),
                timers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create a scheduler and seed the default daily import when the config
    /// enables it.
    pub async fn start(
        importer: Arc<dyn DataImportService>,
        config: ImportSchedulerConfig,
    ) -> Self {
        let scheduler = Self::new(importer);

        if config.schedule_enabled {
            let mut definition =
                ScheduledImport::new(DEFAULT_IMPORT_ID, "Daily card import", config.daily_cron);
            definition.options = config.options;
            info!(
                import_id = DEFAULT_IMPORT_ID,
                cron = %definition.cron_expression,
                "seeding default daily card import"
            );
            scheduler.add_scheduled_import(definition).await;
        }

        scheduler
    }

    // ========================================================================
    // Registry operations
    // ========================================================================

    /// Register a scheduled import, replacing any existing definition with
    /// the same id.
    ///
    /// Computes `next_run` from the cron expression and arms a timer when
    /// the definition is enabled. An unparseable expression leaves the
    /// definition registered but never firing until it is re-added with a
    /// corrected expression.
    pub async fn add_scheduled_import(&self, mut definition: ScheduledImport) {
        definition.next_run = cron::next_run_time(&definition.cron_expression);
        if definition.next_run.is_none() {
            warn!(
                import_id = %definition.id,
                cron = %definition.cron_expression,
                "cron expression did not parse; schedule will not fire"
            );
        }

        let id = definition.id.clone();
        let enabled = definition.enabled;
        let next_run = definition.next_run;
        self.inner.registry.insert(definition).await;

        // Re-adding must never leave two timers armed for one id.
        self.cancel_timer(&id).await;
        if enabled {
            if let Some(next_run) = next_run {
                self.arm_timer(id, next_run).await;
            }
        }
    }

    /// Remove a scheduled import and cancel its timer. Returns whether a
    /// definition existed; idempotent.
    pub async fn remove_scheduled_import(&self, id: &str) -> bool {
        self.cancel_timer(id).await;
        let existed = self.inner.registry.remove(id).await;
        if existed {
            info!(import_id = %id, "removed scheduled import");
        }
        existed
    }

    /// Enable or disable a scheduled import without removing it. Returns
    /// `false` when the id is unknown.
    pub async fn set_scheduled_import_enabled(&self, id: &str, enabled: bool) -> bool {
        let Some(definition) = self.inner.registry.set_enabled(id, enabled).await else {
            return false;
        };

        self.cancel_timer(id).await;
        if enabled {
            let next_run = cron::next_run_time(&definition.cron_expression);
            self.inner.registry.set_next_run(id, next_run).await;
            if let Some(next_run) = next_run {
                self.arm_timer(id.to_string(), next_run).await;
            }
            info!(import_id = %id, "scheduled import enabled");
        } else {
            info!(import_id = %id, "scheduled import disabled");
        }
        true
    }

    /// Get a scheduled import by id.
    pub async fn scheduled_import(&self, id: &str) -> Option<ScheduledImport> {
        self.inner.registry.get(id).await
    }

    /// Unordered snapshot of all scheduled imports.
    pub async fn list_scheduled_imports(&self) -> Vec<ScheduledImport> {
        self.inner.registry.list().await
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run a registered scheduled import immediately.
    ///
    /// Explicit invocations are always recorded as `manual`, even though the
    /// target is a scheduled definition; only the timer-fired path records
    /// `schedule`.
    pub async fn run_scheduled_import(&self, id: &str) -> Result<ImportResult> {
        let definition = self
            .inner
            .registry
            .get(id)
            .await
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;

        self.execute(&definition, Some(definition.id.clone()), TriggeredBy::Manual)
            .await
    }

    /// Run an ad-hoc import with the given options.
    ///
    /// Uses an ephemeral definition that never enters the registry and
    /// schedules nothing, even when a definition with the same id exists.
    pub async fn run_manual_import(&self, options: ImportOptions) -> Result<ImportResult> {
        let definition = ScheduledImport::ad_hoc(options);
        self.execute(&definition, None, TriggeredBy::Manual).await
    }

    /// The sole execution path; every run flows through here and produces
    /// exactly one history entry with a terminal status.
    ///
    /// `scheduled_import_id` is the registry back-reference: present for
    /// timer fires and manual runs of a registered definition, `None` for
    /// ad-hoc runs (which therefore never touch the registry).
    async fn execute(
        &self,
        definition: &ScheduledImport,
        scheduled_import_id: Option<String>,
        triggered_by: TriggeredBy,
    ) -> Result<ImportResult> {
        let entry = self
            .inner
            .history
            .open(scheduled_import_id.clone(), triggered_by)
            .await;
        let history_id = entry.id;
        let start_time = entry.start_time;
        let started = std::time::Instant::now();

        info!(
            import_id = %definition.id,
            history_id = %history_id,
            triggered_by = ?triggered_by,
            "starting card import"
        );

        if !self.inner.importer.is_enabled() {
            let result = ImportResult::failure(
                "card import is disabled",
                started.elapsed().as_millis() as u64,
            );
            self.inner
                .history
                .close(&history_id, HistoryStatus::Failed, result.clone(), Utc::now())
                .await;
            self.finish_run(scheduled_import_id.as_deref(), start_time, &result)
                .await;
            return Err(SchedulerError::ImportDisabled);
        }

        match self
            .inner
            .importer
            .import_all_cards(&definition.options)
            .await
        {
            Ok(result) => {
                self.inner
                    .history
                    .close(
                        &history_id,
                        HistoryStatus::Completed,
                        result.clone(),
                        Utc::now(),
                    )
                    .await;
                self.finish_run(scheduled_import_id.as_deref(), start_time, &result)
                    .await;
                info!(
                    import_id = %definition.id,
                    history_id = %history_id,
                    imported = result.imported,
                    updated = result.updated,
                    failed = result.failed,
                    duration_ms = result.duration_ms,
                    "card import completed"
                );
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                let result =
                    ImportResult::failure(&message, started.elapsed().as_millis() as u64);
                self.inner
                    .history
                    .close(&history_id, HistoryStatus::Failed, result.clone(), Utc::now())
                    .await;
                self.finish_run(scheduled_import_id.as_deref(), start_time, &result)
                    .await;
                Err(SchedulerError::ImportFailed(message))
            }
        }
    }

    /// Post-run bookkeeping for registered definitions: stamp the outcome on
    /// the definition, compute the next occurrence, and re-arm while still
    /// enabled. A failed run is retried at its next natural occurrence, not
    /// before.
    // Boxed (rather than `async fn`) to break the recursive async cycle
    // finish_run -> arm_timer -> timer_fired -> execute -> finish_run,
    // which otherwise prevents the compiler from proving the futures `Send`.
    fn finish_run<'a>(
        &'a self,
        scheduled_import_id: Option<&'a str>,
        last_run: DateTime<Utc>,
        result: &'a ImportResult,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        // Ad-hoc runs carry no back-reference and get no bookkeeping.
        let Some(id) = scheduled_import_id else {
            return;
        };
        // Re-read in case the definition changed mid-run; one removed
        // mid-flight simply misses its update.
        let Some(current) = self.inner.registry.get(id).await else {
            return;
        };

        let next_run = cron::next_run_time(&current.cron_expression);
        let Some(updated) = self
            .inner
            .registry
            .record_run(id, last_run, result.clone(), next_run)
            .await
        else {
            return;
        };

        if updated.enabled {
            if let Some(next_run) = updated.next_run {
                self.arm_timer(updated.id, next_run).await;
            }
        }
        })
    }

    // ========================================================================
    // History & statistics
    // ========================================================================

    /// Most recent history entries across all imports, newest first.
    pub async fn import_history(&self, limit: usize) -> Vec<ImportHistoryEntry> {
        self.inner.history.recent(limit).await
    }

    /// Most recent history entries for one scheduled import, newest first.
    pub async fn scheduled_import_history(
        &self,
        id: &str,
        limit: usize,
    ) -> Vec<ImportHistoryEntry> {
        self.inner.history.recent_for(id, limit).await
    }

    /// Delete history entries that started strictly more than
    /// `days_to_keep` days ago. Returns the number removed.
    pub async fn clear_old_history(&self, days_to_keep: i64) -> usize {
        let removed = self.inner.history.prune_older_than(days_to_keep).await;
        if removed > 0 {
            info!(removed, days_to_keep, "cleared old import history");
        }
        removed
    }

    /// Aggregate scheduler state for dashboards.
    pub async fn import_statistics(&self) -> ImportStatistics {
        let definitions = self.inner.registry.list().await;
        let counts = self.inner.history.counts().await;

        let enabled = definitions.iter().filter(|d| d.enabled).count();
        ImportStatistics {
            total_schedules: definitions.len(),
            enabled_schedules: enabled,
            disabled_schedules: definitions.len() - enabled,
            total_runs: counts.total,
            successful_runs: counts.completed,
            failed_runs: counts.failed,
            running_runs: counts.running,
            last_run: definitions.iter().filter_map(|d| d.last_run).max(),
            next_run: definitions
                .iter()
                .filter(|d| d.enabled)
                .filter_map(|d| d.next_run)
                .min(),
        }
    }

    /// Cancel every armed timer. Call before process exit so pending timers
    /// do not keep the runtime alive.
    pub async fn shutdown(&self) {
        let mut timers = self.inner.timers.write().await;
        let cancelled = timers.len();
        for (_, cancel) in timers.drain() {
            let _ = cancel.send(());
        }
        info!(cancelled, "import scheduler shut down");
    }

    // ========================================================================
    // Timer lifecycle
    // ========================================================================

    /// Arm a single-shot timer for a schedule.
    ///
    /// Inserting into the timer map replaces (and thereby cancels) any stale
    /// timer for the same id, so at most one timer is armed per schedule. A
    /// target time already in the past fires immediately.
    async fn arm_timer(&self, id: String, next_run: DateTime<Utc>) {
        let delay = next_run
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        debug!(
            import_id = %id,
            next_run = %next_run,
            delay_secs = delay.as_secs(),
            "arming import timer"
        );

        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut timers = self.inner.timers.write().await;
            timers.insert(id.clone(), cancel_tx);
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            let deadline = Instant::now() + delay;
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    scheduler.timer_fired(&id).await;
                }
                _ = cancel_rx => {
                    debug!(import_id = %id, "import timer cancelled");
                }
            }
        });
    }

    /// Cancel the armed timer for a schedule, if any.
    async fn cancel_timer(&self, id: &str) {
        let mut timers = self.inner.timers.write().await;
        if let Some(cancel) = timers.remove(id) {
            let _ = cancel.send(());
            debug!(import_id = %id, "import timer cancelled");
        }
    }

    /// Timer-fired path. Failures are logged and swallowed so the scheduler
    /// keeps running; the schedule retries at its next occurrence.
    async fn timer_fired(&self, id: &str) {
        // The fire consumes the armed timer; execution re-arms afterwards,
        // so a disable requested mid-run prevents the next arm.
        {
            let mut timers = self.inner.timers.write().await;
            timers.remove(id);
        }

        let definition = match self.inner.registry.get(id).await {
            Some(d) if d.enabled => d,
            Some(_) => {
                debug!(import_id = %id, "schedule disabled before fire");
                return;
            }
            None => {
                warn!(import_id = %id, "schedule removed before fire");
                return;
            }
        };

        if let Err(e) = self
            .execute(&definition, Some(definition.id.clone()), TriggeredBy::Schedule)
            .await
        {
            error!(import_id = %id, error = %e, "scheduled card import failed");
        }
    }
}
