//! Snapshot Store.
//!
//! Timestamped, write-once artifacts over a [`BlobStore`] backend. Every
//! backend call is bounded by the configured timeout.

use crate::backend::BlobStore;
use crate::errors::{timed_out, Result};
use crate::keys::{timestamp_from_key, Collection, Location};
use chrono::{DateTime, Utc};
use reelwatch_core::diff::DiffResult;
use reelwatch_core::snapshot::Snapshot;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A listed artifact with its creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub location: Location,
    /// Decoded from the key, or the backend's last-modified time for keys
    /// that do not embed one
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, op: &str, location: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| timed_out(op, location, self.timeout))?
    }

    /// Write `payload` as the artifact of `collection` created at `timestamp`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if different bytes occupy the key, `StoreWrite` or
    /// `Timeout` on backend failure.
    pub async fn put(
        &self,
        collection: &Collection,
        timestamp: DateTime<Utc>,
        payload: Vec<u8>,
    ) -> Result<Location> {
        let location = collection.location_for(timestamp);
        let started = Instant::now();
        let size_bytes = payload.len();

        self.bounded(
            "put",
            location.as_str(),
            self.backend.put(location.as_str(), payload),
        )
        .await?;

        tracing::debug!(
            location = %location,
            size_bytes,
            duration_ms = started.elapsed().as_millis() as u64,
            "stored artifact"
        );
        Ok(location)
    }

    /// # Errors
    ///
    /// `NotFound` if nothing is stored at `location`.
    pub async fn get(&self, location: &Location) -> Result<Vec<u8>> {
        self.bounded("get", location.as_str(), self.backend.get(location.as_str()))
            .await
    }

    /// Entries of `collection`, newest first.
    ///
    /// Equal timestamps are ordered by key, descending, so the result is
    /// total and stable.
    ///
    /// # Errors
    ///
    /// `StoreRead` or `Timeout` if the backend listing fails.
    pub async fn list_sorted_by_recency(&self, collection: &Collection) -> Result<Vec<StoredEntry>> {
        let prefix = collection.list_prefix();
        let objects = self
            .bounded("list", &prefix, self.backend.list(&prefix))
            .await?;

        let mut entries: Vec<StoredEntry> = objects
            .into_iter()
            .map(|meta| StoredEntry {
                timestamp: timestamp_from_key(&meta.key).unwrap_or(meta.last_modified),
                location: Location::new(meta.key),
            })
            .collect();

        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.location.cmp(&a.location))
        });
        Ok(entries)
    }

    /// Most recent entry of `collection`, if any.
    ///
    /// # Errors
    ///
    /// As [`SnapshotStore::list_sorted_by_recency`].
    pub async fn latest(&self, collection: &Collection) -> Result<Option<StoredEntry>> {
        Ok(self
            .list_sorted_by_recency(collection)
            .await?
            .into_iter()
            .next())
    }

    /// Remove an artifact; missing artifacts are not an error.
    ///
    /// # Errors
    ///
    /// `StoreWrite` or `Timeout` on backend failure.
    pub async fn delete(&self, location: &Location) -> Result<()> {
        self.bounded(
            "delete",
            location.as_str(),
            self.backend.delete(location.as_str()),
        )
        .await
    }

    /// Persist a snapshot under its own creation time.
    ///
    /// # Errors
    ///
    /// As [`SnapshotStore::put`], plus `Serialization`.
    pub async fn put_snapshot(&self, collection: &Collection, snapshot: &Snapshot) -> Result<Location> {
        let bytes = snapshot.to_bytes()?;
        self.put(collection, snapshot.created_at, bytes).await
    }

    /// Load a listed snapshot; the result carries its location.
    ///
    /// # Errors
    ///
    /// As [`SnapshotStore::get`], plus `InvalidArtifact`.
    pub async fn load_snapshot(&self, entry: &StoredEntry) -> Result<Snapshot> {
        let bytes = self.get(&entry.location).await?;
        let snapshot = Snapshot::from_bytes(&bytes, entry.timestamp)
            .map_err(|e| e.with_location(entry.location.as_str()))?;
        Ok(snapshot.with_location(entry.location.as_str()))
    }

    /// Persist a diff under the creation time of its current snapshot.
    ///
    /// # Errors
    ///
    /// As [`SnapshotStore::put`], plus `Serialization`.
    pub async fn put_diff(&self, collection: &Collection, diff: &DiffResult) -> Result<Location> {
        let bytes = diff.to_bytes()?;
        self.put(collection, diff.created_at, bytes).await
    }

    /// # Errors
    ///
    /// As [`SnapshotStore::get`], plus `InvalidArtifact`.
    pub async fn load_diff(&self, location: &Location) -> Result<DiffResult> {
        let bytes = self.get(location).await?;
        DiffResult::from_bytes(&bytes).map_err(|e| e.with_location(location.as_str()))
    }
}
