//! Retention purge.
//!
//! Deletes artifacts past the retention window. Each deletion is
//! independent: a failure is recorded and the scan continues. Re-running a
//! partial purge finishes it.

use chrono::{DateTime, Utc};
use reelwatch_core::errors::{ExError, ExErrorKind};
use reelwatch_core::retention::{select_expired, RetentionPolicy};
use reelwatch_core::{log_op_end, log_op_start};
use reelwatch_store::{Collection, Location, SnapshotStore};
use std::time::Instant;

/// Outcome of a purge over one collection.
#[derive(Debug, Default)]
pub struct RetentionReport {
    pub collection: String,
    pub deleted: Vec<Location>,
    /// One `Retention` error per entry that could not be deleted, or a
    /// single one if the collection could not be listed
    pub failures: Vec<ExError>,
}

/// Delete every entry of `collection` with `now - timestamp >= policy window`.
pub async fn purge(
    store: &SnapshotStore,
    collection: &Collection,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionReport {
    let started = Instant::now();
    log_op_start!("purge", collection = collection.prefix());

    let mut report = RetentionReport {
        collection: collection.prefix().to_string(),
        ..RetentionReport::default()
    };

    let entries = match store.list_sorted_by_recency(collection).await {
        Ok(entries) => entries,
        Err(e) => {
            report
                .failures
                .push(retention_failure(collection.prefix(), e));
            log_op_end!(
                "purge",
                duration_ms = started.elapsed().as_millis() as u64,
                deleted = 0u64,
                failures = report.failures.len() as u64
            );
            return report;
        }
    };

    for entry in select_expired(&entries, |e| e.timestamp, policy, now) {
        match store.delete(&entry.location).await {
            Ok(()) => {
                tracing::debug!(location = %entry.location, "purged expired artifact");
                report.deleted.push(entry.location.clone());
            }
            Err(e) => {
                tracing::warn!(location = %entry.location, error = %e, "failed to purge artifact");
                report
                    .failures
                    .push(retention_failure(entry.location.as_str(), e));
            }
        }
    }

    log_op_end!(
        "purge",
        duration_ms = started.elapsed().as_millis() as u64,
        deleted = report.deleted.len() as u64,
        failures = report.failures.len() as u64
    );
    report
}

fn retention_failure(location: &str, cause: ExError) -> ExError {
    let message = cause.message().to_string();
    ExError::new(ExErrorKind::Retention)
        .with_op("purge")
        .with_location(location)
        .with_message(message)
        .with_source(cause)
}
