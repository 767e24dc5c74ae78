//! Filesystem bucket backend
//!
//! One directory per bucket; object keys map to relative paths below it.

use crate::backend::atomic::{atomic_write, TEMP_SUFFIX};
use crate::backend::{BlobStore, ObjectMeta};
use crate::errors::{already_exists, invalid_key, read_io_error, write_io_error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Filesystem-backed bucket
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Bucket rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key onto a path below the root, rejecting escapes
    fn resolve(&self, op: &str, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.ends_with('/') {
            return Err(invalid_key(op, key, "empty object name"));
        }
        let relative = Path::new(key);
        let all_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !all_normal {
            return Err(invalid_key(op, key, "must be a relative path without '..'"));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Deepest directory that can contain keys starting with `prefix`
    fn scan_root(&self, prefix: &str) -> PathBuf {
        match prefix.rfind('/') {
            Some(idx) => self.root.join(&prefix[..idx]),
            None => self.root.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve("put", key)?;

        match fs::read(&path).await {
            Ok(existing) if existing == bytes => return Ok(()),
            Ok(_) => return Err(already_exists(key)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(read_io_error("put", key, e)),
        }

        atomic_write(&path, &bytes)
            .await
            .map_err(|e| write_io_error("put", key, e))?;

        tracing::debug!(key, size_bytes = bytes.len(), "wrote object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve("get", key)?;
        fs::read(&path).await.map_err(|e| read_io_error("get", key, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut out = Vec::new();
        let mut pending = vec![self.scan_root(prefix)];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(read_io_error("list", prefix, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| read_io_error("list", prefix, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| read_io_error("list", prefix, e))?;

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX) {
                    continue;
                }
                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                let modified = entry
                    .metadata()
                    .await
                    .and_then(|m| m.modified())
                    .map_err(|e| read_io_error("list", &key, e))?;
                out.push(ObjectMeta {
                    key,
                    last_modified: DateTime::<Utc>::from(modified),
                });
            }
        }

        Ok(out)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve("delete", key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(write_io_error("delete", key, e)),
        }
    }
}
