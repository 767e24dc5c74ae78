//! Reelwatch Store - persistence for snapshots and diffs
//!
//! Provides:
//! - `BlobStore` backend seam with filesystem and in-memory buckets
//! - Timestamped key layout for artifact collections
//! - `SnapshotStore`: bounded put/get/list/delete plus typed helpers

pub mod backend;
pub mod errors;
pub mod keys;
pub mod snapshot_store;

// Re-export key types
pub use backend::{BlobStore, FsBlobStore, MemoryBlobStore, ObjectMeta};
pub use errors::Result;
pub use keys::{Collection, Location};
pub use snapshot_store::{SnapshotStore, StoredEntry};
