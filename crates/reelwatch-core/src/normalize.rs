//! Feed normalization.
//!
//! Flattens the nested `items → events → performances` feed into one
//! [`Record`] per performance. Pure: no I/O, deterministic for a given input.
//!
//! A malformed performance (or a malformed parent that makes its
//! performances unreadable) is skipped and reported in
//! [`Normalized::soft_errors`]; the run continues. Only a feed whose root is
//! not an array fails the whole call.

use crate::errors::{RecordError, Result};
use crate::model::feed::{
    EVENT_DATE, EVENT_ID, EVENT_NEW, EVENT_PATH, EVENT_PERFORMANCES, EVENT_WEB_URL, ITEM_EVENTS,
    ITEM_FIRST_PERFORMANCE, ITEM_ID, ITEM_POSTER, ITEM_PURCHASABLE, ITEM_TITLE,
    PERFORMANCE_BUY_URL, PERFORMANCE_SCREEN, PERFORMANCE_TIME,
};
use crate::model::{RawFeedResponse, Record, KEY_SEPARATOR};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Records in feed nesting order
    pub records: Vec<Record>,
    /// One entry per skipped performance (or unreadable container)
    pub soft_errors: Vec<RecordError>,
}

/// Position of the performance being built, for error reporting.
#[derive(Clone, Copy)]
struct Pos {
    item: usize,
    event: usize,
    performance: usize,
}

impl Pos {
    fn missing(self, field: &'static str) -> RecordError {
        RecordError::MissingField {
            field,
            item: self.item,
            event: self.event,
            performance: self.performance,
        }
    }

    fn invalid(self, field: &'static str, reason: impl Into<String>) -> RecordError {
        RecordError::InvalidField {
            field,
            item: self.item,
            event: self.event,
            performance: self.performance,
            reason: reason.into(),
        }
    }
}

/// Item-level fields copied into every record of the item.
struct ItemFields {
    id: i64,
    title: String,
    is_purchasable: bool,
    first_performance: Option<String>,
    image_url: Option<String>,
}

/// Event-level fields copied into every record of the event.
struct EventFields {
    id: i64,
    date: NaiveDate,
    is_new_release: bool,
    site_path: Option<String>,
    detail_url: Option<String>,
}

/// Flatten a raw feed into records.
///
/// # Errors
///
/// `InvalidFeed` if the feed root is not a JSON array.
pub fn normalize(raw: &RawFeedResponse) -> Result<Normalized> {
    let items = raw.as_value().as_array().ok_or_else(|| RecordError::RootNotArray {
        found: json_type(raw.as_value()).to_string(),
    })?;

    let mut out = Normalized::default();

    for (item_idx, item) in items.iter().enumerate() {
        let pos = Pos {
            item: item_idx,
            event: 0,
            performance: 0,
        };
        let Some(item) = item.as_object() else {
            out.soft_errors.push(pos.invalid("item", "not an object"));
            continue;
        };
        let events = match child_array(item, ITEM_EVENTS, pos) {
            Ok(events) => events,
            Err(e) => {
                out.soft_errors.push(e);
                continue;
            }
        };
        let item_fields = read_item(item, pos);

        for (event_idx, event) in events.iter().enumerate() {
            let pos = Pos {
                event: event_idx,
                ..pos
            };
            let Some(event) = event.as_object() else {
                out.soft_errors.push(pos.invalid("event", "not an object"));
                continue;
            };
            let performances = match child_array(event, EVENT_PERFORMANCES, pos) {
                Ok(performances) => performances,
                Err(e) => {
                    out.soft_errors.push(e);
                    continue;
                }
            };
            let event_fields = read_event(event, pos);

            for (perf_idx, performance) in performances.iter().enumerate() {
                let pos = Pos {
                    performance: perf_idx,
                    ..pos
                };
                match build_record(&item_fields, &event_fields, performance, pos) {
                    Ok(record) => out.records.push(record),
                    Err(e) => out.soft_errors.push(e),
                }
            }
        }
    }

    Ok(out)
}

fn build_record(
    item: &std::result::Result<ItemFields, RecordError>,
    event: &std::result::Result<EventFields, RecordError>,
    performance: &Value,
    pos: Pos,
) -> std::result::Result<Record, RecordError> {
    // Parent faults are reported once per affected performance, at its position.
    let item = item.as_ref().map_err(|e| relocate(e, pos))?;
    let event = event.as_ref().map_err(|e| relocate(e, pos))?;
    let performance = performance
        .as_object()
        .ok_or_else(|| pos.invalid("performance", "not an object"))?;

    let time = required_str(performance, PERFORMANCE_TIME, pos)?;
    if time.trim().is_empty() {
        return Err(pos.invalid(PERFORMANCE_TIME, "empty"));
    }
    if time.contains(KEY_SEPARATOR) {
        return Err(pos.invalid(
            PERFORMANCE_TIME,
            format!("contains reserved separator '{}'", KEY_SEPARATOR),
        ));
    }

    Ok(Record {
        item_id: item.id,
        sub_event_id: event.id,
        title: item.title.clone(),
        occurrence_date: event.date,
        occurrence_time: time,
        screen: optional_str(performance, PERFORMANCE_SCREEN),
        detail_url: event.detail_url.clone(),
        purchase_url: optional_str(performance, PERFORMANCE_BUY_URL),
        image_url: item.image_url.clone(),
        is_purchasable: item.is_purchasable,
        first_performance: item.first_performance.clone(),
        is_new_release: event.is_new_release,
        site_path: event.site_path.clone(),
    })
}

fn read_item(item: &Map<String, Value>, pos: Pos) -> std::result::Result<ItemFields, RecordError> {
    Ok(ItemFields {
        id: required_i64(item, ITEM_ID, pos)?,
        title: required_str(item, ITEM_TITLE, pos)?,
        is_purchasable: optional_bool(item, ITEM_PURCHASABLE),
        first_performance: optional_str(item, ITEM_FIRST_PERFORMANCE),
        image_url: optional_str(item, ITEM_POSTER),
    })
}

fn read_event(
    event: &Map<String, Value>,
    pos: Pos,
) -> std::result::Result<EventFields, RecordError> {
    let raw_date = required_str(event, EVENT_DATE, pos)?;
    Ok(EventFields {
        id: required_i64(event, EVENT_ID, pos)?,
        date: parse_feed_date(&raw_date).ok_or_else(|| {
            pos.invalid(EVENT_DATE, format!("'{}' is not a YYYY-MM-DD date", raw_date))
        })?,
        is_new_release: optional_bool(event, EVENT_NEW),
        site_path: optional_str(event, EVENT_PATH),
        detail_url: optional_str(event, EVENT_WEB_URL),
    })
}

/// Parse `YYYY-MM-DD`, ignoring any `T…` time suffix the feed may append.
pub fn parse_feed_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split('T').next().unwrap_or(raw).trim();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn relocate(err: &RecordError, pos: Pos) -> RecordError {
    match err {
        RecordError::MissingField { field, .. } => pos.missing(*field),
        RecordError::InvalidField { field, reason, .. } => pos.invalid(*field, reason.clone()),
        RecordError::RootNotArray { .. } => err.clone(),
    }
}

/// A missing child array is empty; a non-array value is a fault.
fn child_array<'a>(
    obj: &'a Map<String, Value>,
    key: &'static str,
    pos: Pos,
) -> std::result::Result<&'a [Value], RecordError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(values)) => Ok(values.as_slice()),
        Some(other) => Err(pos.invalid(key, format!("expected array, got {}", json_type(other)))),
    }
}

/// Integers are accepted as JSON numbers or numeric strings.
fn required_i64(
    obj: &Map<String, Value>,
    key: &'static str,
    pos: Pos,
) -> std::result::Result<i64, RecordError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(pos.missing(key)),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| pos.invalid(key, format!("{} is not an integer", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| pos.invalid(key, format!("'{}' is not an integer", s))),
        Some(other) => Err(pos.invalid(key, format!("expected integer, got {}", json_type(other)))),
    }
}

fn required_str(
    obj: &Map<String, Value>,
    key: &'static str,
    pos: Pos,
) -> std::result::Result<String, RecordError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(pos.missing(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(pos.invalid(key, format!("expected string, got {}", json_type(other)))),
    }
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_bool(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
