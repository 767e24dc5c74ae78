//! Fakes for pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::future::pending;
use reelwatch_core::errors::{ExError, ExErrorKind, Result};
use reelwatch_core::model::{RawFeedResponse, Record};
use reelwatch_core::retention::RetentionPolicy;
use reelwatch_engine::{FeedSource, Notifier, Pipeline, PipelineSettings};
use reelwatch_store::{BlobStore, Collection, MemoryBlobStore, ObjectMeta, SnapshotStore};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - ChronoDuration::hours(hours)
}

/// One movie with the given `(event_id, time)` performances on 2024-05-11.
pub fn feed(performances: &[(i64, &str)]) -> Value {
    let events: Vec<Value> = performances
        .iter()
        .map(|(event_id, time)| {
            json!({
                "eventId": event_id,
                "date": "2024-05-11T00:00:00",
                "performances": [{"time": time, "screen": "Sala 1"}]
            })
        })
        .collect();
    json!([{"movieId": 42, "name": "Dune", "events": events}])
}

/// Serves whatever feed is currently set.
#[derive(Default)]
pub struct StaticFeed {
    body: Mutex<Option<Value>>,
    failure: Mutex<Option<ExError>>,
}

impl StaticFeed {
    pub fn new(body: Value) -> Arc<Self> {
        let feed = Self::default();
        feed.set(body);
        Arc::new(feed)
    }

    pub fn failing(err: ExError) -> Arc<Self> {
        let feed = Self::default();
        *feed.failure.lock().unwrap() = Some(err);
        Arc::new(feed)
    }

    pub fn set(&self, body: Value) {
        *self.body.lock().unwrap() = Some(body);
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<RawFeedResponse> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        let body = self.body.lock().unwrap().clone().unwrap_or_else(|| json!([]));
        Ok(RawFeedResponse::from_value(body))
    }
}

/// Records every delivered key; fails for the configured times.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<String>>,
    fail_times: Mutex<HashSet<String>>,
    hang_times: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for_time(&self, time: &str) {
        self.fail_times.lock().unwrap().insert(time.to_string());
    }

    /// Never answer for occurrences at `time`.
    pub fn hang_for_time(&self, time: &str) {
        self.hang_times.lock().unwrap().insert(time.to_string());
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, record: &Record) -> Result<()> {
        let hangs = self.hang_times.lock().unwrap().contains(&record.occurrence_time);
        if hangs {
            pending::<()>().await;
        }
        if self.fail_times.lock().unwrap().contains(&record.occurrence_time) {
            return Err(ExError::new(ExErrorKind::Notify).with_message("HTTP 502 Bad Gateway"));
        }
        self.delivered
            .lock()
            .unwrap()
            .push(record.identity_key().to_string());
        Ok(())
    }
}

/// Memory bucket that can be told to fail writes or deletes.
#[derive(Default)]
pub struct FaultyBlobStore {
    inner: MemoryBlobStore,
    fail_puts_with_prefix: Mutex<Option<String>>,
    hang_puts_with_prefix: Mutex<Option<String>>,
    fail_deletes: Mutex<HashSet<String>>,
    vanished: Mutex<HashSet<String>>,
}

impl FaultyBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_puts_under(&self, prefix: &str) {
        *self.fail_puts_with_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    /// Puts under `prefix` never complete.
    pub fn hang_puts_under(&self, prefix: &str) {
        *self.hang_puts_with_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    /// `key` stays listed but reads report it missing.
    pub fn vanish_on_read(&self, key: &str) {
        self.vanished.lock().unwrap().insert(key.to_string());
    }

    pub fn insert_with_modified(&self, key: &str, bytes: &[u8], last_modified: DateTime<Utc>) {
        self.inner
            .insert_with_modified(key, bytes.to_vec(), last_modified)
            .unwrap();
    }

    pub fn fail_delete_of(&self, key: &str) {
        self.fail_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let failing = self.fail_puts_with_prefix.lock().unwrap().clone();
        if let Some(prefix) = failing {
            if key.starts_with(&prefix) {
                return Err(ExError::new(ExErrorKind::StoreWrite)
                    .with_op("put")
                    .with_location(key)
                    .with_message("bucket is read-only"));
            }
        }
        let hanging = self.hang_puts_with_prefix.lock().unwrap().clone();
        if hanging.is_some_and(|prefix| key.starts_with(&prefix)) {
            pending::<()>().await;
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        if self.vanished.lock().unwrap().contains(key) {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op("get")
                .with_location(key)
                .with_message("object not found"));
        }
        self.inner.get(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        self.inner.list(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.fail_deletes.lock().unwrap().contains(key) {
            return Err(ExError::new(ExErrorKind::StoreWrite)
                .with_op("delete")
                .with_location(key)
                .with_message("permission denied"));
        }
        self.inner.delete(key).await
    }
}

pub fn settings(retention_hours: u64) -> PipelineSettings {
    PipelineSettings {
        snapshots: Collection::snapshots("scraped-data"),
        diffs: Collection::diffs("differences-data"),
        retention: RetentionPolicy::from_hours(retention_hours).unwrap(),
        notify_concurrency: 2,
        notify_timeout: Duration::from_secs(5),
        trigger: "test".to_string(),
    }
}

pub fn pipeline(
    feed: Arc<StaticFeed>,
    backend: Arc<dyn BlobStore>,
    notifier: Arc<RecordingNotifier>,
) -> Pipeline {
    Pipeline::new(
        feed,
        SnapshotStore::new(backend, Duration::from_secs(5)),
        notifier,
        settings(144),
    )
}

/// Pipeline whose store calls and notifications give up after `limit`.
pub fn impatient_pipeline(
    feed: Arc<StaticFeed>,
    backend: Arc<dyn BlobStore>,
    notifier: Arc<RecordingNotifier>,
    limit: Duration,
) -> Pipeline {
    let mut settings = settings(144);
    settings.notify_timeout = limit;
    Pipeline::new(feed, SnapshotStore::new(backend, limit), notifier, settings)
}
