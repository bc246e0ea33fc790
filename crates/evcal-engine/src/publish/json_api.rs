use chrono::{DateTime, NaiveDateTime, Utc};
use evcal_common::event::EventRecord;
use serde::Serialize;

/// Minimal entry for clients with tight payload limits, such as in-world displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactEvent<'a> {
    pub name: &'a str,
    pub start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct DetailDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub events: &'a [EventRecord],
}

pub fn compact(events: &[EventRecord]) -> Vec<CompactEvent<'_>> {
    events
        .iter()
        .map(|e| CompactEvent {
            name: e.display_name(),
            start: e.date_time,
            location: e.location.as_deref(),
        })
        .collect()
}

pub fn render_compact(events: &[EventRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&compact(events))
}

pub fn render_detail(events: &[EventRecord], generated_at: DateTime<Utc>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&DetailDocument {
        generated_at,
        count: events.len(),
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    #[test]
    fn compact_keeps_three_fields() {
        let events = vec![EventRecord {
            name: Some("Jazz Night".into()),
            date_time: NaiveDate::from_ymd_opt(2025, 5, 10).and_then(|d| d.and_hms_opt(21, 0, 0)),
            organizer: Some("@jazz".into()),
            ..EventRecord::default()
        }];
        let value: Value = serde_json::from_str(&render_compact(&events).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "name": "Jazz Night", "start": "2025-05-10T21:00:00" }])
        );
    }

    #[test]
    fn detail_counts_events() {
        let events = vec![EventRecord::default(), EventRecord::default()];
        let value: Value = serde_json::from_str(&render_detail(&events, Utc::now()).unwrap()).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["events"].as_array().unwrap().len(), 2);
    }
}
