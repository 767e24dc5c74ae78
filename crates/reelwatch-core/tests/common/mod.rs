use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reelwatch_core::{Record, Snapshot};
use serde_json::{json, Value};

/// Build a feed of `items` items × `events` events × `performances` performances.
///
/// Ids are derived from the indices so every occurrence has a distinct key.
#[allow(dead_code)]
pub fn grid_feed(items: usize, events: usize, performances: usize) -> Value {
    let items: Vec<Value> = (0..items)
        .map(|i| {
            let events: Vec<Value> = (0..events)
                .map(|e| {
                    let performances: Vec<Value> = (0..performances)
                        .map(|p| json!({"time": format!("{:02}:{:02}", 10 + p / 60, p % 60), "screen": format!("Sala {}", p)}))
                        .collect();
                    json!({
                        "eventId": (i * 1000 + e) as i64,
                        "date": "2024-05-01T00:00:00",
                        "performances": performances
                    })
                })
                .collect();
            json!({
                "movieId": i as i64,
                "name": format!("Movie {}", i),
                "events": events
            })
        })
        .collect();
    Value::Array(items)
}

#[allow(dead_code)]
pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn record(item: i64, event: i64, time: &str) -> Record {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    Record::new(item, event, format!("Movie {}", item), date, time)
}

#[allow(dead_code)]
pub fn snapshot(records: Vec<Record>) -> Snapshot {
    Snapshot::new(records, at(10)).unwrap()
}
