//! Snapshot document schema.
//!
//! ## Schema Version
//!
//! Current snapshot schema version: **1**
//!
//! ```json
//! {
//!   "snapshot_schema_version": 1,
//!   "created_at": "2024-05-01T10:00:00.000Z",
//!   "record_count": 2,
//!   "content_digest": "<sha256 hex>",
//!   "records": [ ... ]
//! }
//! ```
//!
//! Older artifacts are a bare JSON array of records. They are still
//! readable; their digest is derived on load and their creation time is
//! supplied by the caller (usually decoded from the storage key).

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::Record;
use crate::snapshot::digest::compute_content_digest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Serialized form of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub snapshot_schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
    pub content_digest: String,
    pub records: Vec<Record>,
}

/// Normalized record set of one run.
///
/// Records keep feed order and may contain duplicate identity keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub created_at: DateTime<Utc>,
    pub content_digest: String,
    /// Storage location, once persisted or loaded
    pub location: Option<String>,
}

impl Snapshot {
    /// Build an unpersisted snapshot.
    ///
    /// # Errors
    ///
    /// `Serialization` if the records cannot be digested.
    pub fn new(records: Vec<Record>, created_at: DateTime<Utc>) -> Result<Self> {
        let content_digest = compute_content_digest(&records)?;
        Ok(Self {
            records,
            created_at,
            content_digest,
            location: None,
        })
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            snapshot_schema_version: SNAPSHOT_SCHEMA_VERSION,
            created_at: self.created_at,
            record_count: self.records.len(),
            content_digest: self.content_digest.clone(),
            records: self.records.clone(),
        }
    }

    /// Pretty-printed JSON document bytes.
    ///
    /// # Errors
    ///
    /// `Serialization` on encoding failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.to_document()).map_err(|e| {
            ExError::from(e).with_op("encode_snapshot")
        })
    }

    /// Decode a stored snapshot.
    ///
    /// `fallback_created_at` is used only for legacy bare-array artifacts,
    /// which carry no timestamp of their own.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` if the bytes are not a snapshot document, the schema
    /// version is unknown, or the stored digest does not match the records.
    pub fn from_bytes(bytes: &[u8], fallback_created_at: DateTime<Utc>) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| invalid(format!("snapshot is not valid JSON: {}", e)))?;

        if value.is_array() {
            let records: Vec<Record> = serde_json::from_value(value)
                .map_err(|e| invalid(format!("legacy snapshot records are malformed: {}", e)))?;
            return Self::new(records, fallback_created_at);
        }

        let doc: SnapshotDocument = serde_json::from_value(value)
            .map_err(|e| invalid(format!("snapshot document is malformed: {}", e)))?;

        if doc.snapshot_schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(invalid(format!(
                "unsupported snapshot_schema_version {}",
                doc.snapshot_schema_version
            )));
        }

        let snapshot = Self::new(doc.records, doc.created_at)?;
        if snapshot.content_digest != doc.content_digest {
            return Err(invalid(format!(
                "content_digest mismatch: stored {}, computed {}",
                doc.content_digest, snapshot.content_digest
            )));
        }
        Ok(snapshot)
    }
}

fn invalid(message: String) -> ExError {
    ExError::new(ExErrorKind::InvalidArtifact)
        .with_op("decode_snapshot")
        .with_message(message)
}
