//! Diff output types.

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{IdentityKey, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DIFF_SCHEMA_VERSION: u32 = 1;

/// Result of diffing one snapshot against its predecessor.
///
/// Persisted once per run, including when `entries` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Schema version of this structure (always 1)
    pub diff_schema_version: u32,
    /// Creation time of the current snapshot
    pub created_at: DateTime<Utc>,
    /// Snapshot diffed against; `None` on bootstrap
    pub reference: Option<SnapshotRef>,
    /// Content digest of the current snapshot
    pub current_digest: String,
    /// New records, in current-snapshot order
    pub entries: Vec<DiffEntry>,
    /// Keys that occur more than once in the current snapshot, sorted
    #[serde(default)]
    pub duplicate_keys: Vec<IdentityKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub location: Option<String>,
    pub content_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub key: IdentityKey,
    pub record: Record,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_bootstrap(&self) -> bool {
        self.reference.is_none()
    }

    /// Pretty-printed JSON bytes.
    ///
    /// # Errors
    ///
    /// `Serialization` on encoding failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| ExError::from(e).with_op("encode_diff"))
    }

    /// Decode a stored diff.
    ///
    /// # Errors
    ///
    /// `InvalidArtifact` if the bytes are not a diff document of a known
    /// schema version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let diff: DiffResult = serde_json::from_slice(bytes).map_err(|e| {
            ExError::new(ExErrorKind::InvalidArtifact)
                .with_op("decode_diff")
                .with_message(format!("diff document is malformed: {}", e))
        })?;
        if diff.diff_schema_version != DIFF_SCHEMA_VERSION {
            return Err(ExError::new(ExErrorKind::InvalidArtifact)
                .with_op("decode_diff")
                .with_message(format!(
                    "unsupported diff_schema_version {}",
                    diff.diff_schema_version
                )));
        }
        Ok(diff)
    }
}
