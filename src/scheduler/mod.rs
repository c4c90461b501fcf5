//! Scheduler for recurring card-data imports.
//!
//! Owns the registry of named scheduled imports, computes next-run times
//! from a simplified cron expression, arms single-shot timers, executes
//! imports (timer-fired or manual), and records every attempt in an
//! in-memory history log.
//!
//! # Usage
//!
//! ```ignore
//! // At the application's composition root:
//! let scheduler = ImportScheduler::start(importer, config).await;
//!
//! // Register a schedule
//! scheduler
//!     .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
//!     .await;
//!
//! // Trigger one immediately
//! let result = scheduler.run_scheduled_import("nightly").await?;
//!
//! // Before process exit
//! scheduler.shutdown().await;
//! ```

pub mod cron;
pub mod error;
pub mod history;
pub mod registry;
pub mod schedule;
pub mod service;

pub use error::{Result, SchedulerError};
pub use schedule::{
    HistoryStatus, ImportHistoryEntry, ImportStatistics, ScheduledImport, TriggeredBy,
};
pub use service::ImportScheduler;
