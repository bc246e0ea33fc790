use chrono::{Datelike, IsoWeek, NaiveDate, Weekday};
use evcal_common::event::EventRecord;
use std::collections::BTreeMap;
use std::fmt::Write;

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Scheduled events bucketed by ISO week, weeks and events in time order.
pub fn group_by_week(events: &[EventRecord]) -> BTreeMap<(i32, u32), Vec<&EventRecord>> {
    let mut weeks: BTreeMap<(i32, u32), Vec<&EventRecord>> = BTreeMap::new();
    for event in events {
        if let Some(start) = event.date_time {
            let week: IsoWeek = start.date().iso_week();
            weeks.entry((week.year(), week.week())).or_default().push(event);
        }
    }
    for bucket in weeks.values_mut() {
        bucket.sort_by_key(|e| e.date_time);
    }
    weeks
}

pub fn render_weekly(events: &[EventRecord], title: &str) -> String {
    let mut html = String::new();
    let title = escape_html(title);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n"
    );

    for ((year, week), bucket) in group_by_week(events) {
        let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon);
        let heading = match monday {
            Some(monday) => format!("{} W{:02} ({} 〜)", year, week, monday.format("%m/%d")),
            None => format!("{} W{:02}", year, week),
        };
        let _ = writeln!(html, "<section>\n<h2>{}</h2>\n<ul>", escape_html(&heading));
        for event in bucket {
            let when = event
                .date_time
                .map(|dt| dt.format("%m/%d (%a) %H:%M").to_string())
                .unwrap_or_default();
            let _ = write!(
                html,
                "<li><time>{}</time> <strong>{}</strong>",
                escape_html(&when),
                escape_html(event.display_name())
            );
            if let Some(location) = &event.location {
                let _ = write!(html, " @ {}", escape_html(location));
            }
            if let Some(organizer) = &event.organizer {
                let _ = write!(html, " <small>{}</small>", escape_html(organizer));
            }
            if event.is_regular
                && let Some(frequency) = event.frequency
            {
                let _ = write!(html, " <em>{}</em>", frequency);
            }
            html.push_str("</li>\n");
        }
        html.push_str("</ul>\n</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
