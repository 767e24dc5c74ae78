//! Snapshot diff engine.
//!
//! Computes the records present in the current snapshot whose identity key
//! is absent from the reference snapshot (new minus old). Vanished records
//! are not reported.
//!
//! ## Entry point
//!
//! ```ignore
//! use reelwatch_core::diff::{compute_diff, render_diff_summary};
//!
//! let diff = compute_diff(reference.as_ref(), &current);
//! println!("{}", render_diff_summary(&diff));
//! ```
//!
//! ## Guarantees
//!
//! - **Bootstrap**: no reference yields an empty result.
//! - **Determinism**: entries follow the order of the current snapshot.
//! - **At most once per key**: duplicate keys in the current snapshot keep
//!   their first occurrence and are listed in `duplicate_keys`.

pub mod engine;
pub mod model;
pub mod summary;

pub use engine::compute_diff;
pub use model::{DiffEntry, DiffResult, SnapshotRef, DIFF_SCHEMA_VERSION};
pub use summary::render_diff_summary;
