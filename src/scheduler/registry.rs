//! In-memory registry of scheduled-import definitions.
//!
//! The registry is the sole owner of [`ScheduledImport`] state. Definitions
//! live for the process lifetime only; there is deliberately no persistence,
//! so a restart starts from whatever the composition root re-registers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::import::ImportResult;

use super::schedule::ScheduledImport;

/// Shared handle to the definition registry.
#[derive(Clone, Default)]
pub struct ImportRegistry {
    inner: Arc<RwLock<HashMap<String, ScheduledImport>>>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, silently replacing any existing one with the
    /// same id. Last write wins.
    pub async fn insert(&self, definition: ScheduledImport) {
        let mut inner = self.inner.write().await;
        let replaced = inner
            .insert(definition.id.clone(), definition.clone())
            .is_some();
        debug!(import_id = %definition.id, replaced, "registered scheduled import");
    }

    /// Remove a definition. Returns whether it existed; idempotent.
    pub async fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.write().await;
        inner.remove(id).is_some()
    }

    /// Get a definition by id.
    pub async fn get(&self, id: &str) -> Option<ScheduledImport> {
        let inner = self.inner.read().await;
        inner.get(id).cloned()
    }

    /// Unordered snapshot of all definitions.
    pub async fn list(&self) -> Vec<ScheduledImport> {
        let inner = self.inner.read().await;
        inner.values().cloned().collect()
    }

    /// Number of registered definitions.
    pub(crate) async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.len()
    }

    /// Toggle a definition's enabled flag.
    ///
    /// Returns the updated definition, or `None` if the id is unknown.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Option<ScheduledImport> {
        let mut inner = self.inner.write().await;
        let definition = inner.get_mut(id)?;
        definition.enabled = enabled;
        Some(definition.clone())
    }

    /// Overwrite a definition's computed next-run time.
    pub async fn set_next_run(&self, id: &str, next_run: Option<DateTime<Utc>>) {
        let mut inner = self.inner.write().await;
        if let Some(definition) = inner.get_mut(id) {
            definition.next_run = next_run;
        }
    }

    /// Record the outcome of a run on its definition.
    ///
    /// Returns the updated definition so the caller can decide whether to
    /// re-arm, or `None` when the id is not registered (ad-hoc manual runs,
    /// or a definition removed mid-flight).
    pub async fn record_run(
        &self,
        id: &str,
        last_run: DateTime<Utc>,
        last_result: ImportResult,
        next_run: Option<DateTime<Utc>>,
    ) -> Option<ScheduledImport> {
        let mut inner = self.inner.write().await;
        let definition = inner.get_mut(id)?;
        definition.last_run = Some(last_run);
        definition.last_result = Some(last_result);
        definition.next_run = next_run;
        Some(definition.clone())
    }
}
