//! Common test utilities.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use deckforge_importer::import::{DataImportService, ImportOptions, ImportResult};

/// Install the tracing subscriber for test output; `RUST_LOG` controls
/// verbosity. Safe to call from every test, only the first takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scripted import collaborator for exercising the scheduler.
pub struct RecordingImporter {
    enabled: AtomicBool,
    fail: AtomicBool,
    calls: AtomicUsize,
    last_options: Mutex<Option<ImportOptions>>,
}

impl RecordingImporter {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self {
            enabled: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_options(&self) -> Option<ImportOptions> {
        self.last_options.lock().await.clone()
    }
}

#[async_trait]
impl DataImportService for RecordingImporter {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn import_all_cards(&self, options: &ImportOptions) -> anyhow::Result<ImportResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().await = Some(options.clone());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("bulk data endpoint unreachable");
        }
        Ok(ImportResult {
            success: true,
            imported: 250,
            updated: 12,
            skipped: 3,
            failed: 0,
            errors: Vec::new(),
            duration_ms: 42,
            metadata: Some(serde_json::json!({"source": "bulk"})),
        })
    }
}
