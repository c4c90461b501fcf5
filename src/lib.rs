//! Deckforge importer - scheduled card-data import orchestration.
//!
//! The card database keeps itself current by periodically pulling bulk card
//! data from an upstream source. This crate owns that orchestration: named
//! recurring import schedules, single-shot timers, manual triggering, and an
//! in-memory history of every attempt. The actual data fetch/persist work is
//! delegated to a [`import::DataImportService`] collaborator; HTTP routes and
//! dashboards consume the scheduler through [`scheduler::ImportScheduler`].
//!
//! State is process-local and lost on restart, and nothing here coordinates
//! across multiple process instances. Run one scheduler per deployment.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod config;

// ============================================================================
// Domain
// ============================================================================

pub mod import;
pub mod scheduler;

pub use config::ImportSchedulerConfig;
pub use import::{DataImportService, ImportOptions, ImportResult};
pub use scheduler::ImportScheduler;
