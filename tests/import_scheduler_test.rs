//! End-to-end scheduler behavior against a scripted import collaborator.

mod common;

use std::time::Duration;

use chrono::Utc;
use common::RecordingImporter;
use deckforge_importer::config::ImportSchedulerConfig;
use deckforge_importer::import::ImportOptions;
use deckforge_importer::scheduler::{
    HistoryStatus, ImportScheduler, ScheduledImport, TriggeredBy,
};

/// Long enough to cover any daily schedule; paused-clock tests auto-advance
/// to the armed deadline, so this costs no real time.
const PAST_ANY_DAILY_FIRE: Duration = Duration::from_secs(26 * 60 * 60);

#[tokio::test(start_paused = true)]
async fn timer_fire_executes_and_records_schedule_history() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler
        .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
        .await;

    tokio::time::sleep(PAST_ANY_DAILY_FIRE).await;

    assert!(importer.call_count() >= 1);

    let history = scheduler.scheduled_import_history("nightly", 10).await;
    assert!(!history.is_empty());
    for entry in &history {
        assert_eq!(entry.triggered_by, TriggeredBy::Schedule);
        assert_eq!(entry.status, HistoryStatus::Completed);
        assert!(entry.end_time.is_some());
    }

    let def = scheduler.scheduled_import("nightly").await.unwrap();
    assert!(def.last_run.is_some());
    assert!(def.last_result.unwrap().success);
    assert!(def.next_run.unwrap() > Utc::now());

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_schedule_produces_no_schedule_triggered_runs() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler
        .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
        .await;
    assert!(scheduler.set_scheduled_import_enabled("nightly", false).await);

    tokio::time::sleep(PAST_ANY_DAILY_FIRE).await;

    assert_eq!(importer.call_count(), 0);
    assert!(scheduler.scheduled_import_history("nightly", 10).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn removed_schedule_never_fires() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler
        .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
        .await;
    assert!(scheduler.remove_scheduled_import("nightly").await);

    tokio::time::sleep(PAST_ANY_DAILY_FIRE).await;

    assert_eq!(importer.call_count(), 0);
    assert!(scheduler.import_history(10).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_prevents_pending_fires() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler
        .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
        .await;
    scheduler.shutdown().await;

    tokio::time::sleep(PAST_ANY_DAILY_FIRE).await;

    assert_eq!(importer.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn seeded_default_schedule_fires_daily() {
    let importer = RecordingImporter::new();
    let config = ImportSchedulerConfig {
        schedule_enabled: true,
        ..Default::default()
    };
    let scheduler = ImportScheduler::start(importer.clone(), config).await;

    tokio::time::sleep(PAST_ANY_DAILY_FIRE).await;

    assert!(importer.call_count() >= 1);
    let history = scheduler.import_history(10).await;
    assert!(history
        .iter()
        .all(|e| e.scheduled_import_id.as_deref() == Some("daily-card-import")));

    scheduler.shutdown().await;
}

#[tokio::test]
async fn manual_import_passes_options_through() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    let options = ImportOptions {
        batch_size: Some(100),
        skip_existing: true,
        source: Some("neo".to_string()),
    };
    let result = scheduler.run_manual_import(options).await.unwrap();
    assert!(result.success);
    assert_eq!(result.imported, 250);

    let seen = importer.last_options().await.unwrap();
    assert_eq!(seen.batch_size, Some(100));
    assert!(seen.skip_existing);
    assert_eq!(seen.source.as_deref(), Some("neo"));

    assert!(scheduler.list_scheduled_imports().await.is_empty());
}

#[tokio::test]
async fn failed_run_is_recorded_and_the_schedule_recovers() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler
        .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
        .await;

    importer.set_failing(true);
    assert!(scheduler.run_scheduled_import("nightly").await.is_err());

    let def = scheduler.scheduled_import("nightly").await.unwrap();
    assert!(def.enabled, "a failed run must not disable the schedule");
    assert!(!def.last_result.unwrap().success);

    importer.set_failing(false);
    let result = scheduler.run_scheduled_import("nightly").await.unwrap();
    assert!(result.success);

    // Newest first: the recovery, then the failure.
    let history = scheduler.scheduled_import_history("nightly", 10).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, HistoryStatus::Completed);
    assert_eq!(history[1].status, HistoryStatus::Failed);

    scheduler.shutdown().await;
}

#[tokio::test]
async fn import_disabled_flag_fails_manual_runs() {
    let importer = RecordingImporter::new();
    importer.set_enabled(false);
    let scheduler = ImportScheduler::new(importer.clone());

    assert!(scheduler.run_manual_import(ImportOptions::default()).await.is_err());

    let history = scheduler.import_history(1).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, HistoryStatus::Failed);
}

#[tokio::test]
async fn clear_old_history_keeps_fresh_entries() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler.run_manual_import(ImportOptions::default()).await.unwrap();
    scheduler.run_manual_import(ImportOptions::default()).await.unwrap();

    assert_eq!(scheduler.clear_old_history(30).await, 0);
    assert_eq!(scheduler.import_history(10).await.len(), 2);
}

#[tokio::test]
async fn statistics_reflect_registry_and_history() {
    let importer = RecordingImporter::new();
    let scheduler = ImportScheduler::new(importer.clone());

    scheduler
        .add_scheduled_import(ScheduledImport::new("nightly", "Nightly import", "0 3 * * *"))
        .await;
    scheduler.run_scheduled_import("nightly").await.unwrap();

    let stats = scheduler.import_statistics().await;
    assert_eq!(stats.total_schedules, 1);
    assert_eq!(stats.enabled_schedules, 1);
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.successful_runs, 1);
    assert_eq!(stats.failed_runs, 0);
    assert!(stats.last_run.is_some());
    assert!(stats.next_run.is_some());

    scheduler.shutdown().await;
}
