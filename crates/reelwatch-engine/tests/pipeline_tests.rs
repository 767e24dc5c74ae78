//! Pipeline scenarios over in-memory fakes.

mod common;

use common::{
    feed, hours_ago, impatient_pipeline, now, pipeline, settings, FaultyBlobStore,
    RecordingNotifier, StaticFeed,
};
use chrono::{Duration as ChronoDuration, NaiveDate};
use reelwatch_core::errors::{ExError, ExErrorKind};
use reelwatch_core::{Record, Snapshot};
use reelwatch_engine::{Pipeline, RunStage};
use reelwatch_store::{BlobStore, Collection, MemoryBlobStore, SnapshotStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn store_over(backend: Arc<dyn BlobStore>) -> SnapshotStore {
    SnapshotStore::new(backend, Duration::from_secs(5))
}

async fn seed_snapshot(backend: Arc<dyn BlobStore>, hours: i64, time: &str) {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let snapshot = Snapshot::new(vec![Record::new(7, 7, "Alien", date, time)], hours_ago(hours)).unwrap();
    store_over(backend)
        .put_snapshot(&Collection::snapshots("scraped-data"), &snapshot)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_two_runs_detect_one_new_occurrence() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(source.clone(), backend.clone(), notifier.clone());

    let first = pipeline.run_at(hours_ago(1)).await.unwrap();
    assert_eq!(first.record_count, 1);
    assert_eq!(first.new_records, 0);
    assert!(first.reference_location.is_none());
    assert!(notifier.delivered().is_empty());

    source.set(feed(&[(1, "18:00"), (2, "20:30")]));
    let second = pipeline.run_at(now()).await.unwrap();
    assert_eq!(second.record_count, 2);
    assert_eq!(second.new_records, 1);
    assert_eq!(second.reference_location, Some(first.snapshot_location.clone()));
    assert_eq!(second.final_stage, RunStage::Done);
    assert_eq!(notifier.delivered(), vec!["42|2|2024-05-11|20:30".to_string()]);

    let store = store_over(backend);
    let diffs = store
        .list_sorted_by_recency(&Collection::diffs("differences-data"))
        .await
        .unwrap();
    assert_eq!(diffs.len(), 2, "every snapshot has a diff partner");
    let persisted = store.load_diff(&second.diff_location).await.unwrap();
    assert_eq!(persisted.len(), 1);
}

#[tokio::test]
async fn test_store_write_failure_prevents_notification() {
    let backend = FaultyBlobStore::new();
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(source.clone(), backend.clone(), notifier.clone());
    pipeline.run_at(hours_ago(1)).await.unwrap();

    backend.fail_puts_under("differences-data/");
    source.set(feed(&[(1, "18:00"), (2, "20:30")]));
    let err = pipeline.run_at(now()).await.unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::StoreWrite);
    assert_eq!(err.stage(), Some("persisting_artifacts"));
    assert!(err.run_id().is_some());
    assert!(notifier.delivered().is_empty());
}

#[tokio::test]
async fn test_failed_notification_does_not_stop_the_rest() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(source.clone(), backend, notifier.clone());
    pipeline.run_at(hours_ago(1)).await.unwrap();

    notifier.fail_for_time("21:00");
    source.set(feed(&[(1, "18:00"), (2, "20:00"), (3, "21:00"), (4, "22:00")]));
    let report = pipeline.run_at(now()).await.unwrap();

    assert_eq!(report.new_records, 3);
    assert_eq!(report.notified, 2);
    assert_eq!(report.notify_failures.len(), 1);
    let failure = &report.notify_failures[0];
    assert_eq!(failure.kind(), ExErrorKind::Notify);
    assert_eq!(failure.identity_key(), Some("42|3|2024-05-11|21:00"));
    assert_eq!(failure.stage(), Some("notifying"));
    assert!(report.has_failures());
    assert_eq!(notifier.delivered().len(), 2);
}

#[tokio::test]
async fn test_retention_removes_only_entries_past_window() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    seed_snapshot(backend.clone(), 10, "10:00").await;
    seed_snapshot(backend.clone(), 200, "11:00").await;

    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(StaticFeed::new(feed(&[(1, "18:00")])), backend.clone(), notifier);
    let report = pipeline.run_at(now()).await.unwrap();

    assert_eq!(report.purged(), 1);
    let remaining = store_over(backend)
        .list_sorted_by_recency(&Collection::snapshots("scraped-data"))
        .await
        .unwrap();
    let ages: Vec<_> = remaining.iter().map(|e| e.timestamp).collect();
    assert_eq!(ages, vec![now(), hours_ago(10)]);
    assert!(report
        .reference_location
        .as_ref()
        .is_some_and(|l| l.as_str().contains("2024-05-10T02-00-00-000Z")));
}

#[tokio::test]
async fn test_failed_deletion_does_not_stop_purge() {
    let backend = FaultyBlobStore::new();
    seed_snapshot(backend.clone(), 200, "10:00").await;
    seed_snapshot(backend.clone(), 300, "11:00").await;
    let stuck = Collection::snapshots("scraped-data").location_for(hours_ago(300));
    backend.fail_delete_of(stuck.as_str());

    let pipeline = pipeline(
        StaticFeed::new(feed(&[(1, "18:00")])),
        backend.clone(),
        RecordingNotifier::new(),
    );
    let report = pipeline.run_at(now()).await.unwrap();

    let failures: Vec<&ExError> = report.retention_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind(), ExErrorKind::Retention);
    assert_eq!(failures[0].location(), Some(stuck.as_str()));
    assert_eq!(report.purged(), 1);
    assert!(backend.keys().contains(&stuck.to_string()));
}

#[tokio::test]
async fn test_fetch_failure_is_fatal_and_writes_nothing() {
    let backend = FaultyBlobStore::new();
    let source = StaticFeed::failing(ExError::new(ExErrorKind::Fetch).with_message("HTTP 503"));
    let notifier = RecordingNotifier::new();

    let err = pipeline(source, backend.clone(), notifier)
        .run_at(now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Fetch);
    assert_eq!(err.stage(), Some("fetching"));
    assert!(backend.keys().is_empty());
}

#[tokio::test]
async fn test_feed_root_object_is_fatal_at_normalizing() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let source = StaticFeed::new(json!({"error": "maintenance"}));

    let err = pipeline(source, backend, RecordingNotifier::new())
        .run_at(now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidFeed);
    assert_eq!(err.stage(), Some("normalizing"));
}

#[tokio::test]
async fn test_malformed_occurrence_is_reported_not_fatal() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let mut body = feed(&[(1, "18:00"), (2, "20:00")]);
    body[0]["events"][1]["performances"][0] = json!({"screen": "Sala 2"});

    let report = pipeline(StaticFeed::new(body), backend, RecordingNotifier::new())
        .run_at(now())
        .await
        .unwrap();

    assert_eq!(report.record_count, 1);
    assert_eq!(report.soft_errors.len(), 1);
    assert_eq!(report.soft_errors[0].kind(), ExErrorKind::Normalization);
}

#[tokio::test]
async fn test_rerun_at_same_instant_is_idempotent() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(source.clone(), backend, notifier.clone());
    pipeline.run_at(hours_ago(1)).await.unwrap();

    source.set(feed(&[(1, "18:00"), (2, "20:30")]));
    let first_attempt = pipeline.run_at(now()).await.unwrap();
    let retry = pipeline.run_at(now()).await.unwrap();

    assert_eq!(retry.snapshot_location, first_attempt.snapshot_location);
    assert_eq!(retry.diff_location, first_attempt.diff_location);
    assert_eq!(retry.reference_location, first_attempt.reference_location);
    assert_eq!(retry.new_records, 1);
}

#[tokio::test]
async fn test_summary_mentions_bootstrap_and_failures() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let mut body = feed(&[(1, "18:00")]);
    body[0]["events"][0]["performances"]
        .as_array_mut()
        .unwrap()
        .push(json!({"time": "bad|time"}));

    let pipeline = Pipeline::new(
        StaticFeed::new(body),
        store_over(backend),
        RecordingNotifier::new(),
        settings(24),
    );
    let summary = pipeline.run_at(now()).await.unwrap().render_summary();

    assert!(summary.contains("none (bootstrap)"));
    assert!(summary.contains("non-fatal failures (1)"));
    assert!(summary.contains("ERR_NORMALIZATION"));
}

#[tokio::test]
async fn test_stray_object_in_snapshots_folder_is_skipped() {
    let backend = FaultyBlobStore::new();
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(source.clone(), backend.clone(), notifier.clone());
    let first = pipeline.run_at(hours_ago(2)).await.unwrap();
    backend.insert_with_modified("scraped-data/.DS_Store", b"\0\0\x01Bud1", now());

    source.set(feed(&[(1, "18:00"), (2, "20:30")]));
    let report = pipeline.run_at(hours_ago(1)).await.unwrap();

    assert_eq!(report.reference_location, Some(first.snapshot_location));
    assert_eq!(report.new_records, 1);
    assert_eq!(notifier.delivered(), vec!["42|2|2024-05-11|20:30".to_string()]);
    assert_eq!(report.skipped_artifacts.len(), 1);
    let skipped = &report.skipped_artifacts[0];
    assert_eq!(skipped.kind(), ExErrorKind::InvalidArtifact);
    assert_eq!(skipped.location(), Some("scraped-data/.DS_Store"));
    assert_eq!(skipped.stage(), Some("locating_reference"));
    assert!(report.has_failures());

    // Once past the window the stray object is purged like any other entry
    let week_later = now() + ChronoDuration::days(7);
    pipeline.run_at(week_later).await.unwrap();
    assert!(!backend.keys().contains(&"scraped-data/.DS_Store".to_string()));
    let next = pipeline
        .run_at(week_later + ChronoDuration::hours(1))
        .await
        .unwrap();
    assert!(next.skipped_artifacts.is_empty());
    assert!(next.reference_location.is_some());
}

#[tokio::test]
async fn test_reference_vanished_after_listing_is_bootstrap() {
    let backend = FaultyBlobStore::new();
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = pipeline(source.clone(), backend.clone(), notifier.clone());
    let first = pipeline.run_at(hours_ago(1)).await.unwrap();
    backend.vanish_on_read(first.snapshot_location.as_str());

    source.set(feed(&[(1, "18:00"), (2, "20:30")]));
    let report = pipeline.run_at(now()).await.unwrap();

    assert!(report.reference_location.is_none());
    assert_eq!(report.new_records, 0);
    assert_eq!(report.record_count, 2);
    assert!(notifier.delivered().is_empty());
}

#[tokio::test]
async fn test_unanswered_notification_times_out_and_is_collected() {
    let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = impatient_pipeline(
        source.clone(),
        backend,
        notifier.clone(),
        Duration::from_millis(100),
    );
    pipeline.run_at(hours_ago(1)).await.unwrap();

    notifier.hang_for_time("21:00");
    source.set(feed(&[(1, "18:00"), (2, "20:00"), (3, "21:00")]));
    let report = pipeline.run_at(now()).await.unwrap();

    assert_eq!(report.notified, 1);
    assert_eq!(report.notify_failures.len(), 1);
    let failure = &report.notify_failures[0];
    assert_eq!(failure.kind(), ExErrorKind::Notify);
    assert_eq!(failure.identity_key(), Some("42|3|2024-05-11|21:00"));
    assert_eq!(
        failure.source_error().map(ExError::kind),
        Some(ExErrorKind::Timeout)
    );
    assert_eq!(notifier.delivered(), vec!["42|2|2024-05-11|20:00".to_string()]);
}

#[tokio::test]
async fn test_stalled_store_write_times_out_before_notifying() {
    let backend = FaultyBlobStore::new();
    let source = StaticFeed::new(feed(&[(1, "18:00")]));
    let notifier = RecordingNotifier::new();
    let pipeline = impatient_pipeline(
        source.clone(),
        backend.clone(),
        notifier.clone(),
        Duration::from_millis(100),
    );
    pipeline.run_at(hours_ago(1)).await.unwrap();

    backend.hang_puts_under("scraped-data/");
    source.set(feed(&[(1, "18:00"), (2, "20:30")]));
    let err = pipeline.run_at(now()).await.unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Timeout);
    assert_eq!(err.code(), "ERR_TIMEOUT");
    assert_eq!(err.stage(), Some("persisting_artifacts"));
    assert!(notifier.delivered().is_empty());
}
