//! In-process backend for tests and dry runs.

use crate::backend::{BlobStore, ObjectMeta};
use crate::errors::{already_exists, not_found, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelwatch_core::errors::{ExError, ExErrorKind};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Map-backed bucket with the same write-once rules as [`super::FsBlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with an explicit last-modified time, bypassing the
    /// write-once check. Used to seed foreign or legacy keys.
    ///
    /// # Errors
    ///
    /// `Internal` if the map lock is poisoned.
    pub fn insert_with_modified(
        &self,
        key: impl Into<String>,
        bytes: Vec<u8>,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        self.lock("insert")?.insert(
            key.into(),
            StoredObject {
                bytes,
                last_modified,
            },
        );
        Ok(())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self, op: &str) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>> {
        self.objects.lock().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op(op.to_string())
                .with_message("memory store lock poisoned")
        })
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut objects = self.lock("put")?;
        if let Some(existing) = objects.get(key) {
            if existing.bytes == bytes {
                return Ok(());
            }
            return Err(already_exists(key));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.lock("get")?
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| not_found("get", key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        Ok(self
            .lock("list")?
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectMeta {
                key: key.clone(),
                last_modified: o.last_modified,
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock("delete")?.remove(key);
        Ok(())
    }
}
