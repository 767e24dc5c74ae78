//! Blob backends.
//!
//! A backend is a flat key → bytes namespace with object-storage semantics:
//! keys are `/`-separated, objects are written once, listing is by prefix and
//! reports a last-modified time.

pub mod atomic;
pub mod fs;
pub mod memory;

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Listing entry returned by [`BlobStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`.
    ///
    /// Rewriting identical bytes succeeds; different bytes fail with
    /// `AlreadyExists`.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read an object; `NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// All objects whose key starts with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Remove an object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
