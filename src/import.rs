//! Contract with the bulk card-data import collaborator.
//!
//! The scheduler never talks to the upstream card source itself. It hands an
//! [`ImportOptions`] to whatever implements [`DataImportService`] and records
//! the [`ImportResult`] that comes back. Batching, rate limiting, and retries
//! against the upstream API are the collaborator's responsibility.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Options passed through to a bulk card import.
///
/// Opaque to the scheduler beyond serialization; the import service decides
/// what each field means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Number of cards per upstream request batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// Skip cards that already exist in the database.
    #[serde(default)]
    pub skip_existing: bool,
    /// Optional upstream source label (e.g. a specific set code).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Outcome of a single bulk card import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    /// Whether the import as a whole succeeded.
    pub success: bool,
    /// Cards newly inserted.
    #[serde(default)]
    pub imported: usize,
    /// Cards updated in place.
    #[serde(default)]
    pub updated: usize,
    /// Cards skipped (already present).
    #[serde(default)]
    pub skipped: usize,
    /// Cards that failed to import.
    #[serde(default)]
    pub failed: usize,
    /// Human-readable error messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Wall-clock duration of the import in milliseconds.
    pub duration_ms: u64,
    /// Collaborator-defined extra detail (set counts, source URLs, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ImportResult {
    /// Synthesize a failed result carrying a single error message.
    ///
    /// Used when the collaborator errors out before producing a result of
    /// its own.
    pub fn failure(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            imported: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            errors: vec![message.into()],
            duration_ms,
            metadata: None,
        }
    }
}

/// The external bulk import service.
///
/// Implementations perform the actual fetch/persist work against the card
/// database. Calls may take a long time and perform network I/O.
#[async_trait]
pub trait DataImportService: Send + Sync {
    /// Whether the import feature is enabled at all (feature flag).
    fn is_enabled(&self) -> bool;

    /// Run a full card import with the given options.
    async fn import_all_cards(&self, options: &ImportOptions) -> anyhow::Result<ImportResult>;
}
