//! Heuristic event extraction from post text.
//!
//! Posts announcing events follow loose conventions: a labelled line per field
//! (`日時: 5/3 21:00`, `会場: ...`), a bracketed title, hashtags at the end.
//! Every heuristic here is best-effort; missing fields stay `None` and the
//! schema validator decides what to keep.

use super::normalize::{fold_width, normalize_text};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime};
use evcal_common::event::EventRecord;
use evcal_common::record::RawRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").expect("valid regex"));
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").expect("valid regex"));
static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【([^】]+)】").expect("valid regex"));

static FULL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*(?:[/.\-]|年)\s*(\d{1,2})\s*(?:[/.\-]|月)\s*(\d{1,2})").expect("valid regex")
});
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d/])(\d{1,2})\s*(?:/|月)\s*(\d{1,2})(?:日|[^\d/]|$)").expect("valid regex")
});
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{1,2}):(\d{2})(?:\D|$)").expect("valid regex"));
static HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})時(?:(\d{1,2})分|(半))?").expect("valid regex"));

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    #[serde(default = "default_name_labels")]
    pub name_labels: Vec<String>,
    #[serde(default = "default_date_labels")]
    pub date_labels: Vec<String>,
    #[serde(default = "default_organizer_labels")]
    pub organizer_labels: Vec<String>,
    #[serde(default = "default_location_labels")]
    pub location_labels: Vec<String>,
    /// A month/day already further in the past than this is read as next year.
    #[serde(default = "default_rollover_days")]
    pub rollover_days: i64,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            name_labels: default_name_labels(),
            date_labels: default_date_labels(),
            organizer_labels: default_organizer_labels(),
            location_labels: default_location_labels(),
            rollover_days: default_rollover_days(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_name_labels() -> Vec<String> {
    strings(&["イベント名", "イベント", "タイトル", "Event", "Title"])
}

fn default_date_labels() -> Vec<String> {
    strings(&["日時", "開催日", "日程", "Date", "When"])
}

fn default_organizer_labels() -> Vec<String> {
    strings(&["主催者", "主催", "Organizer", "Host"])
}

fn default_location_labels() -> Vec<String> {
    strings(&["場所", "会場", "ワールド", "Location", "World", "Venue"])
}

fn default_rollover_days() -> i64 {
    30
}

/// Builds `^\s*(label1|label2)\s*:\s*(value)$`, case-insensitive, per line.
fn label_regex(labels: &[String]) -> Result<Option<Regex>, regex::Error> {
    if labels.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = labels.iter().map(|l| regex::escape(l)).collect();
    let pattern = format!(r"(?im)^\s*(?:{})\s*:\s*(.+?)\s*$", alternatives.join("|"));
    Regex::new(&pattern).map(Some)
}

pub struct EventExtractor {
    rules: ExtractionRules,
    name_re: Option<Regex>,
    date_re: Option<Regex>,
    organizer_re: Option<Regex>,
    location_re: Option<Regex>,
}

impl EventExtractor {
    pub fn new(rules: ExtractionRules) -> Result<Self, regex::Error> {
        Ok(Self {
            name_re: label_regex(&rules.name_labels)?,
            date_re: label_regex(&rules.date_labels)?,
            organizer_re: label_regex(&rules.organizer_labels)?,
            location_re: label_regex(&rules.location_labels)?,
            rules,
        })
    }

    /// Extract an event from a collected record. `today` anchors year inference.
    pub fn extract(&self, record: &RawRecord, today: NaiveDate) -> EventRecord {
        let mut event = self.extract_text(record.text(), record.author(), today);
        event.source_url = record.url().map(str::to_string);
        event
    }

    pub fn extract_text(&self, text: &str, author: Option<&str>, today: NaiveDate) -> EventRecord {
        let folded = fold_width(text);
        let mut event = EventRecord {
            name: self.extract_name(&folded),
            date_time: self.extract_date_time(&folded, today),
            organizer: self.extract_organizer(&folded, author),
            location: labelled(self.location_re.as_ref(), &folded),
            description: non_empty(folded.trim().to_string()),
            ..EventRecord::default()
        };
        for tag in extract_hashtags(&normalize_text(&folded)) {
            event.add_hashtag(tag);
        }
        event
    }

    fn extract_name(&self, folded: &str) -> Option<String> {
        if let Some(name) = labelled(self.name_re.as_ref(), folded) {
            return Some(truncate(name));
        }
        if let Some(caps) = BRACKET_RE.captures(folded)
            && let Some(name) = non_empty(normalize_text(&caps[1]))
        {
            return Some(truncate(name));
        }
        folded
            .lines()
            .map(|line| {
                let line = URL_RE.replace_all(line, "");
                let line = HASHTAG_RE.replace_all(&line, "");
                normalize_text(&line)
            })
            .find(|line| !line.is_empty() && !self.is_labelled_line(line))
            .map(truncate)
    }

    fn is_labelled_line(&self, line: &str) -> bool {
        [&self.date_re, &self.organizer_re, &self.location_re]
            .into_iter()
            .flatten()
            .any(|re| re.is_match(line))
    }

    fn extract_date_time(&self, folded: &str, today: NaiveDate) -> Option<NaiveDateTime> {
        // A labelled date line is more trustworthy than the first date-like text.
        let haystack =
            labelled_raw(self.date_re.as_ref(), folded).unwrap_or_else(|| folded.to_string());
        let haystack = URL_RE.replace_all(&haystack, " ");

        let date = parse_date(&haystack, today, self.rules.rollover_days)?;
        let time = parse_time(&haystack).unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time))
    }

    fn extract_organizer(&self, folded: &str, author: Option<&str>) -> Option<String> {
        if let Some(organizer) = labelled(self.organizer_re.as_ref(), folded) {
            return Some(organizer);
        }
        let without_urls = URL_RE.replace_all(folded, " ");
        if let Some(caps) = MENTION_RE.captures(&without_urls) {
            return Some(format!("@{}", &caps[1]));
        }
        author
            .map(|a| a.trim_start_matches('@'))
            .filter(|a| !a.is_empty())
            .map(|a| format!("@{a}"))
    }
}

fn labelled_raw(re: Option<&Regex>, text: &str) -> Option<String> {
    re?.captures(text).map(|caps| caps[1].to_string())
}

fn labelled(re: Option<&Regex>, text: &str) -> Option<String> {
    labelled_raw(re, text).and_then(|value| non_empty(normalize_text(&value)))
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn truncate(value: String) -> String {
    if value.chars().count() <= MAX_NAME_CHARS {
        value
    } else {
        value.chars().take(MAX_NAME_CHARS).collect()
    }
}

/// `#tag` tokens in order of appearance, without repeats.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for m in HASHTAG_RE.find_iter(text) {
        let tag = m.as_str().to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn parse_date(text: &str, today: NaiveDate, rollover_days: i64) -> Option<NaiveDate> {
    if let Some(caps) = FULL_DATE_RE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    for caps in MONTH_DAY_RE.captures_iter(text) {
        let (Ok(month), Ok(day)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        if let Some(date) = infer_year(month, day, today, rollover_days) {
            return Some(date);
        }
    }
    None
}

/// Month/day in the reference year, or the following year when that date is
/// more than `rollover_days` behind `today`.
pub fn infer_year(month: u32, day: u32, today: NaiveDate, rollover_days: i64) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    let cutoff = today - ChronoDuration::days(rollover_days);
    match this_year {
        Some(date) if date >= cutoff => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = CLOCK_RE.captures(text) {
        let hour = caps[1].parse().ok()?;
        let minute = caps[2].parse().ok()?;
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            return Some(time);
        }
    }
    let caps = HOUR_RE.captures(text)?;
    let hour = caps[1].parse().ok()?;
    let minute = match (caps.get(2), caps.get(3)) {
        (Some(m), _) => m.as_str().parse().ok()?,
        (None, Some(_)) => 30,
        (None, None) => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EventExtractor {
        EventExtractor::new(ExtractionRules::default()).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn labelled_post() {
        let text = "イベント名：ＶＲ交流会\n日時：5/10 21:30〜\n主催：@vr_host\n会場: Japan Street\n#VRChat #交流会 #VRChat";
        let event = extractor().extract_text(text, Some("poster"), day(2024, 5, 1));
        assert_eq!(event.name.as_deref(), Some("VR交流会"));
        assert_eq!(
            event.date_time,
            Some(day(2024, 5, 10).and_hms_opt(21, 30, 0).unwrap())
        );
        assert_eq!(event.organizer.as_deref(), Some("@vr_host"));
        assert_eq!(event.location.as_deref(), Some("Japan Street"));
        assert_eq!(event.hashtags, vec!["#VRChat", "#交流会"]);
    }

    #[test]
    fn bracket_title_and_kanji_date() {
        let text = "【毎週金曜 ジャズバー】\n2024年6月7日 22時半から\nワールド：Jazz Lounge";
        let event = extractor().extract_text(text, None, day(2024, 6, 1));
        assert_eq!(event.name.as_deref(), Some("毎週金曜 ジャズバー"));
        assert_eq!(
            event.date_time,
            Some(day(2024, 6, 7).and_hms_opt(22, 30, 0).unwrap())
        );
        assert_eq!(event.location.as_deref(), Some("Jazz Lounge"));
        assert_eq!(event.organizer, None);
    }

    #[test]
    fn first_line_name_and_author_fallback() {
        let text = "#VRChat\nDJ night tonight\nhttps://t.co/abc";
        let event = extractor().extract_text(text, Some("@dj_cat"), day(2024, 1, 1));
        assert_eq!(event.name.as_deref(), Some("DJ night tonight"));
        assert_eq!(event.organizer.as_deref(), Some("@dj_cat"));
        assert_eq!(event.date_time, None);
    }

    #[test]
    fn month_day_rolls_into_next_year() {
        assert_eq!(infer_year(1, 5, day(2024, 12, 20), 30), Some(day(2025, 1, 5)));
        // Recently past dates stay in the reference year.
        assert_eq!(infer_year(12, 1, day(2024, 12, 20), 30), Some(day(2024, 12, 1)));
        assert_eq!(infer_year(2, 30, day(2024, 1, 1), 30), None);
    }

    #[test]
    fn kanji_month_day_with_hour() {
        let event = extractor().extract_text("3月15日 20時 集合", None, day(2025, 3, 1));
        let dt = event.date_time.unwrap();
        assert_eq!((dt.month(), dt.day()), (3, 15));
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(20, 0, 0).unwrap());
    }

    #[test]
    fn urls_do_not_yield_dates_or_mentions() {
        let text = "meetup https://example.com/@someone/12/25";
        let event = extractor().extract_text(text, None, day(2024, 1, 1));
        assert_eq!(event.date_time, None);
        assert_eq!(event.organizer, None);
    }
}
