//! Calendar exports: Google Calendar CSV and RFC 5545 iCalendar.

use super::PublishError;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use evcal_common::event::EventRecord;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

pub const CSV_HEADER: [&str; 7] = [
    "Subject",
    "Start Date",
    "Start Time",
    "End Date",
    "End Time",
    "Description",
    "Location",
];

const MAX_LINE_OCTETS: usize = 75;

/// Events without a start time cannot be placed on a calendar.
fn scheduled(events: &[EventRecord]) -> impl Iterator<Item = (&EventRecord, NaiveDateTime)> {
    events
        .iter()
        .filter_map(|e| e.date_time.map(|start| (e, start)))
}

pub fn render_csv(events: &[EventRecord], duration: ChronoDuration) -> Result<String, PublishError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for (event, start) in scheduled(events) {
        let end = start + duration;
        writer.write_record([
            event.display_name().to_string(),
            start.format("%m/%d/%Y").to_string(),
            start.format("%I:%M %p").to_string(),
            end.format("%m/%d/%Y").to_string(),
            end.format("%I:%M %p").to_string(),
            event.description.clone().unwrap_or_default(),
            event.location.clone().unwrap_or_default(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PublishError::Encoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PublishError::Encoding(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct IcsOptions {
    pub calendar_name: String,
    pub duration: ChronoDuration,
    /// `None` writes floating local times.
    pub timezone: Option<String>,
    pub generated_at: DateTime<Utc>,
}

pub fn render_ics(events: &[EventRecord], options: &IcsOptions) -> String {
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        "VERSION:2.0".into(),
        "PRODID:-//evcal//event calendar//EN".into(),
        "CALSCALE:GREGORIAN".into(),
        format!("X-WR-CALNAME:{}", escape_text(&options.calendar_name)),
    ];
    if let Some(tz) = &options.timezone {
        lines.push(format!("X-WR-TIMEZONE:{}", tz));
    }

    // Series masters carry an RRULE that already covers their instances.
    let masters: HashSet<(&str, NaiveDateTime)> = scheduled(events)
        .filter(|(e, _)| e.is_regular && e.frequency.is_some() && !e.is_occurrence())
        .map(|(e, start)| (e.display_name(), start))
        .collect();

    let stamp = options.generated_at.format("%Y%m%dT%H%M%SZ");
    for (event, start) in scheduled(events) {
        if let Some(master_start) = event.occurrence_of
            && masters.contains(&(event.display_name(), master_start))
        {
            continue;
        }
        lines.push("BEGIN:VEVENT".into());
        lines.push(format!("UID:{}", event_uid(event, start)));
        lines.push(format!("DTSTAMP:{}", stamp));
        lines.push(date_property("DTSTART", start, options.timezone.as_deref()));
        lines.push(date_property(
            "DTEND",
            start + options.duration,
            options.timezone.as_deref(),
        ));
        lines.push(format!("SUMMARY:{}", escape_text(event.display_name())));
        if let Some(location) = &event.location {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        if let Some(description) = &event.description {
            lines.push(format!("DESCRIPTION:{}", escape_text(description)));
        }
        if let Some(organizer) = &event.organizer {
            lines.push(format!("X-EVCAL-ORGANIZER:{}", escape_text(organizer)));
        }
        if let Some(url) = &event.source_url {
            lines.push(format!("URL:{}", url));
        }
        if !event.hashtags.is_empty() {
            let tags: Vec<String> = event.hashtags.iter().map(|t| escape_text(t)).collect();
            lines.push(format!("CATEGORIES:{}", tags.join(",")));
        }
        if event.is_regular
            && !event.is_occurrence()
            && let Some(frequency) = event.frequency
        {
            lines.push(format!("RRULE:{}", frequency.rrule()));
        }
        lines.push("END:VEVENT".into());
    }
    lines.push("END:VCALENDAR".into());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(&line));
        out.push_str("\r\n");
    }
    out
}

fn date_property(name: &str, at: NaiveDateTime, timezone: Option<&str>) -> String {
    let value = at.format("%Y%m%dT%H%M%S");
    match timezone {
        Some(tz) => format!("{};TZID={}:{}", name, tz, value),
        None => format!("{}:{}", name, value),
    }
}

/// Stable across runs for the same event name and start.
fn event_uid(event: &EventRecord, start: NaiveDateTime) -> String {
    let digest = Sha256::digest(event.display_name().as_bytes());
    let hex = format!("{:x}", digest);
    format!("{}-{}@evcal", &hex[..16], start.format("%Y%m%dT%H%M%S"))
}

/// TEXT value escaping: backslash, semicolon, comma and newlines.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Split a content line into chunks of at most 75 octets, never inside a
/// UTF-8 sequence. Continuation lines start with a single space.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            used = 1;
        }
        out.push(c);
        used += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use evcal_common::event::Frequency;

    fn sample() -> EventRecord {
        EventRecord {
            name: Some("Jazz, Blues; and more".into()),
            date_time: NaiveDate::from_ymd_opt(2025, 5, 10).and_then(|d| d.and_hms_opt(21, 30, 0)),
            location: Some("Jazz Lounge".into()),
            description: Some("line one\nline two".into()),
            is_regular: true,
            frequency: Some(Frequency::Weekly),
            ..EventRecord::default()
        }
    }

    fn options() -> IcsOptions {
        IcsOptions {
            calendar_name: "Events".into(),
            duration: ChronoDuration::minutes(90),
            timezone: None,
            generated_at: DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    #[test]
    fn csv_has_google_header_and_times() {
        let csv = render_csv(&[sample()], ChronoDuration::minutes(60)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Subject,Start Date,Start Time,End Date,End Time,Description,Location")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"Jazz, Blues; and more\",05/10/2025,09:30 PM,05/10/2025,10:30 PM,"));
    }

    #[test]
    fn ics_escapes_and_uses_crlf() {
        let ics = render_ics(&[sample()], &options());
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert!(ics.contains("SUMMARY:Jazz\\, Blues\\; and more\r\n"));
        assert!(ics.contains("DESCRIPTION:line one\\nline two\r\n"));
        assert!(ics.contains("DTSTART:20250510T213000\r\n"));
        assert!(ics.contains("DTEND:20250510T230000\r\n"));
        assert!(ics.contains("RRULE:FREQ=WEEKLY\r\n"));
        assert!(!ics.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn folds_long_lines_on_char_boundaries() {
        let line = format!("SUMMARY:{}", "あ".repeat(40));
        let folded = fold_line(&line);
        for part in folded.split("\r\n") {
            assert!(part.len() <= MAX_LINE_OCTETS, "{} octets", part.len());
        }
        assert_eq!(folded.replace("\r\n ", ""), line);
    }

    fn weekly_series() -> Vec<EventRecord> {
        let master = sample();
        let start = master.date_time.unwrap();
        let mut events = vec![master.clone()];
        for week in 1..=3 {
            events.push(EventRecord {
                date_time: Some(start + ChronoDuration::weeks(week)),
                occurrence_of: Some(start),
                ..master.clone()
            });
        }
        events
    }

    #[test]
    fn recurring_series_is_one_vevent_with_one_rrule() {
        let ics = render_ics(&weekly_series(), &options());
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert_eq!(ics.matches("RRULE:").count(), 1);
        assert!(ics.contains("DTSTART:20250510T213000\r\n"));
    }

    #[test]
    fn orphaned_occurrences_are_plain_events() {
        let orphans: Vec<EventRecord> = weekly_series().into_iter().skip(1).collect();
        let ics = render_ics(&orphans, &options());
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 3);
        assert!(!ics.contains("RRULE:"));
    }

    #[test]
    fn csv_lists_every_occurrence() {
        let csv = render_csv(&weekly_series(), ChronoDuration::minutes(60)).unwrap();
        assert_eq!(csv::Reader::from_reader(csv.as_bytes()).records().count(), 4);
    }

    #[test]
    fn uid_is_fixed_for_name_and_start() {
        let event = sample();
        let start = event.date_time.unwrap();
        let uid = event_uid(&event, start);
        assert_eq!(uid, event_uid(&event, start));
        assert!(uid.ends_with("-20250510T213000@evcal"));
        let hex = uid.split('-').next().unwrap();
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        let other = EventRecord {
            name: Some("Other".into()),
            ..sample()
        };
        assert_ne!(event_uid(&other, start), uid);
    }

    #[test]
    fn unscheduled_events_are_skipped() {
        let event = EventRecord {
            date_time: None,
            ..sample()
        };
        assert!(!render_ics(&[event], &options()).contains("BEGIN:VEVENT"));
    }
}
