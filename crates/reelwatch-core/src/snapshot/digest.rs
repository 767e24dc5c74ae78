//! Content digests for snapshots.
//!
//! The digest covers the records only, so two snapshots taken at different
//! times over the same programming compare equal.

use crate::errors::Result;
use crate::model::Record;
use sha2::{Digest, Sha256};

/// SHA-256 of the canonical (compact) JSON of `records`, hex encoded.
///
/// Order-sensitive: the same records in a different order digest differently.
///
/// # Errors
///
/// `Serialization` if the records cannot be encoded.
pub fn compute_content_digest(records: &[Record]) -> Result<String> {
    let canonical = serde_json::to_vec(records)?;
    Ok(hash_bytes(&canonical))
}

pub(crate) fn hash_bytes(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}
