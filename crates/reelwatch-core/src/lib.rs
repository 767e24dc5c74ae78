//! Reelwatch Core - pure domain kernel
//!
//! This crate holds everything in the snapshot pipeline that does no I/O:
//! - Error facility (`ExError`) and structured logging facility
//! - Feed and record models with the derived identity key
//! - Normalization of the nested feed into flat records
//! - Snapshot documents and content digests
//! - The new-minus-old diff engine and its summary renderer
//! - Retention window selection and notification formatting

pub use reelwatch_core_types as core_types;

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod retention;
pub mod snapshot;

// Re-export commonly used types
pub use diff::{compute_diff, render_diff_summary, DiffEntry, DiffResult};
pub use errors::{ExError, ExErrorKind, RecordError, Result};
pub use model::{IdentityKey, RawFeedResponse, Record};
pub use normalize::{normalize, Normalized};
pub use notify::{format_notification, NotificationMessage};
pub use retention::{select_expired, RetentionPolicy};
pub use snapshot::Snapshot;
