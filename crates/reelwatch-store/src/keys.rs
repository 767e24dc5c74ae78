//! Object key layout.
//!
//! Artifacts are stored as `<prefix>/<stem>_<ts>.json`, where `<ts>` is the
//! RFC 3339 UTC creation time at millisecond precision with `:` and `.`
//! replaced by `-`, e.g. `scraped-data/scraped-data_2024-05-01T10-00-00-000Z.json`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SNAPSHOTS_PREFIX: &str = "scraped-data";
pub const DEFAULT_DIFFS_PREFIX: &str = "differences-data";

const SNAPSHOT_STEM: &str = "scraped-data";
const DIFF_STEM: &str = "differences";
const EXTENSION: &str = ".json";

/// Encoded length of `YYYY-MM-DDTHH-MM-SS-mmmZ`
const ENCODED_TS_LEN: usize = 24;

/// Key of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Location {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A family of artifacts sharing a key prefix (snapshots or diffs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    prefix: String,
    stem: String,
}

impl Collection {
    pub fn new(prefix: impl Into<String>, stem: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            stem: stem.into(),
        }
    }

    pub fn snapshots(prefix: impl Into<String>) -> Self {
        Self::new(prefix, SNAPSHOT_STEM)
    }

    pub fn diffs(prefix: impl Into<String>) -> Self {
        Self::new(prefix, DIFF_STEM)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Listing prefix; the trailing `/` keeps sibling prefixes out.
    pub fn list_prefix(&self) -> String {
        format!("{}/", self.prefix)
    }

    pub fn location_for(&self, created_at: DateTime<Utc>) -> Location {
        Location(format!(
            "{}/{}_{}{}",
            self.prefix,
            self.stem,
            encode_timestamp(created_at),
            EXTENSION
        ))
    }
}

pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Inverse of [`encode_timestamp`]; `None` for anything else.
pub fn decode_timestamp(encoded: &str) -> Option<DateTime<Utc>> {
    if encoded.len() != ENCODED_TS_LEN || !encoded.is_ascii() || !encoded.ends_with('Z') {
        return None;
    }
    let mut bytes = encoded.as_bytes().to_vec();
    for (idx, restored) in [(13, b':'), (16, b':'), (19, b'.')] {
        if bytes[idx] != b'-' {
            return None;
        }
        bytes[idx] = restored;
    }
    let rfc3339 = String::from_utf8(bytes).ok()?;
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Creation time embedded in a key of the form `…/<stem>_<ts>.json`.
pub fn timestamp_from_key(key: &str) -> Option<DateTime<Utc>> {
    let file_name = key.rsplit('/').next()?;
    let base = file_name.strip_suffix(EXTENSION)?;
    let (_, encoded) = base.rsplit_once('_')?;
    decode_timestamp(encoded)
}
