//! Snapshot documents.
//!
//! A snapshot is the full normalized record set of one run, persisted
//! immutably. This module owns the on-disk document shape and its digest;
//! persistence lives in `reelwatch-store`.

pub mod digest;
pub mod document;

pub use digest::compute_content_digest;
pub use document::{Snapshot, SnapshotDocument, SNAPSHOT_SCHEMA_VERSION};
