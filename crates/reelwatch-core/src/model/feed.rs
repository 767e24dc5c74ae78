//! Raw programming feed as returned by the upstream API.
//!
//! The response is kept as an untyped JSON tree so that one malformed
//! screening cannot fail deserialization of the whole feed. Field access
//! and validation happen in [`crate::normalize`].

use crate::errors::{ExError, ExErrorKind, Result};
use serde_json::Value;

// Item (movie) level
pub const ITEM_ID: &str = "movieId";
pub const ITEM_TITLE: &str = "name";
pub const ITEM_PURCHASABLE: &str = "isPurchasable";
pub const ITEM_FIRST_PERFORMANCE: &str = "firstPerformance";
pub const ITEM_POSTER: &str = "moviePosterMedium";
pub const ITEM_EVENTS: &str = "events";

// Sub-event (event) level
pub const EVENT_ID: &str = "eventId";
pub const EVENT_DATE: &str = "date";
pub const EVENT_NEW: &str = "movieNew";
pub const EVENT_PATH: &str = "moviePath";
pub const EVENT_WEB_URL: &str = "webUrl";
pub const EVENT_PERFORMANCES: &str = "performances";

// Occurrence (performance) level
pub const PERFORMANCE_TIME: &str = "time";
pub const PERFORMANCE_SCREEN: &str = "screen";
pub const PERFORMANCE_BUY_URL: &str = "buyUrl";

/// Opaque nested feed body: items → events → performances.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedResponse(Value);

impl RawFeedResponse {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// `InvalidFeed` if the body is not JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map(Self).map_err(|e| {
            ExError::new(ExErrorKind::InvalidFeed)
                .with_op("decode_feed")
                .with_message(format!("feed body is not valid JSON: {}", e))
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
