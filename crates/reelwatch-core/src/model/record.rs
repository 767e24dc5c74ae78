//! Canonical flattened record and its identity key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between identity key components.
///
/// Cannot occur in the integer or date components; the normalizer rejects
/// occurrence times that contain it.
pub const KEY_SEPARATOR: char = '|';

/// Composite identity of one screening: `item|sub_event|date|time`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Build the key from its components.
    pub fn from_parts(item_id: i64, sub_event_id: i64, date: NaiveDate, time: &str) -> Self {
        Self(format!(
            "{item_id}{sep}{sub_event_id}{sep}{}{sep}{time}",
            date.format("%Y-%m-%d"),
            sep = KEY_SEPARATOR
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}

/// One occurrence (screening) of one sub-event (event) of one item (movie).
///
/// Item- and sub-event-level fields are copied down from the feed so a
/// record is self-contained. Serialized field order is stable, which keeps
/// snapshot digests deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub item_id: i64,
    pub sub_event_id: i64,
    pub title: String,
    pub occurrence_date: NaiveDate,
    pub occurrence_time: String,
    /// Screen / hall label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_purchasable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_performance: Option<String>,
    #[serde(default)]
    pub is_new_release: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_path: Option<String>,
}

impl Record {
    /// Minimal record with all descriptive fields empty.
    pub fn new(
        item_id: i64,
        sub_event_id: i64,
        title: impl Into<String>,
        occurrence_date: NaiveDate,
        occurrence_time: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            sub_event_id,
            title: title.into(),
            occurrence_date,
            occurrence_time: occurrence_time.into(),
            screen: None,
            detail_url: None,
            purchase_url: None,
            image_url: None,
            is_purchasable: false,
            first_performance: None,
            is_new_release: false,
            site_path: None,
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::from_parts(
            self.item_id,
            self.sub_event_id,
            self.occurrence_date,
            &self.occurrence_time,
        )
    }
}
