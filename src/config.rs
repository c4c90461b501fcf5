//! Scheduler configuration.

use serde::Deserialize;

use crate::import::ImportOptions;

/// Construction-time settings for the import scheduler.
///
/// Typically deserialized from the application's config file by the
/// composition root and passed to [`crate::ImportScheduler::start`].
#[derive(Debug, Clone, Deserialize)]
pub struct ImportSchedulerConfig {
    /// Seed the default daily card import at startup.
    #[serde(default)]
    pub schedule_enabled: bool,
    /// Cron expression for the default daily import.
    #[serde(default = "ImportSchedulerConfig::default_daily_cron")]
    pub daily_cron: String,
    /// Options used by the default daily import.
    #[serde(default)]
    pub options: ImportOptions,
}

impl Default for ImportSchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_enabled: false,
            daily_cron: Self::default_daily_cron(),
            options: ImportOptions::default(),
        }
    }
}

impl ImportSchedulerConfig {
    fn default_daily_cron() -> String {
        // 03:00 UTC, after the upstream source publishes its nightly bulk data.
        "0 3 * * *".to_string()
    }
}
