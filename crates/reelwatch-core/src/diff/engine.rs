//! Diff computation.

use crate::diff::model::{DiffEntry, DiffResult, SnapshotRef, DIFF_SCHEMA_VERSION};
use crate::model::{IdentityKey, Record};
use crate::snapshot::Snapshot;
use std::collections::{BTreeSet, HashSet};

/// Diff `current` against `reference` (new minus old).
///
/// - `reference == None` is a bootstrap run: no entries.
/// - Equal content digests short-circuit to no entries.
/// - Otherwise every record of `current` whose key is not in `reference` is
///   emitted once, in order.
///
/// O(|reference| + |current|).
pub fn compute_diff(reference: Option<&Snapshot>, current: &Snapshot) -> DiffResult {
    // None when nothing can be new: bootstrap or identical content
    let reference_keys: Option<HashSet<IdentityKey>> = reference
        .filter(|r| r.content_digest != current.content_digest)
        .map(|r| r.records.iter().map(Record::identity_key).collect());

    let mut seen: HashSet<IdentityKey> = HashSet::with_capacity(current.records.len());
    let mut duplicates: BTreeSet<IdentityKey> = BTreeSet::new();
    let mut entries = Vec::new();

    for record in &current.records {
        let key = record.identity_key();
        if !seen.insert(key.clone()) {
            duplicates.insert(key);
            continue;
        }
        if let Some(known) = &reference_keys {
            if !known.contains(&key) {
                entries.push(DiffEntry {
                    key,
                    record: record.clone(),
                });
            }
        }
    }

    DiffResult {
        diff_schema_version: DIFF_SCHEMA_VERSION,
        created_at: current.created_at,
        reference: reference.map(|r| SnapshotRef {
            location: r.location.clone(),
            content_digest: r.content_digest.clone(),
        }),
        current_digest: current.content_digest.clone(),
        entries,
        duplicate_keys: duplicates.into_iter().collect(),
    }
}
