use crate::process::normalize::normalize_text;
use evcal_common::event::EventRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupRules {
    /// Minimum Jaro-Winkler similarity of normalized names.
    #[serde(default = "default_name_similarity")]
    pub name_similarity: f64,
    #[serde(default = "default_same_day_required")]
    pub same_day_required: bool,
    #[serde(default)]
    pub organizer_must_match: bool,
}

impl Default for DedupRules {
    fn default() -> Self {
        Self {
            name_similarity: default_name_similarity(),
            same_day_required: default_same_day_required(),
            organizer_must_match: false,
        }
    }
}

fn default_name_similarity() -> f64 {
    0.85
}

fn default_same_day_required() -> bool {
    true
}

fn name_key(name: &str) -> String {
    normalize_text(name)
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn organizer_key(organizer: &str) -> String {
    organizer.trim().trim_start_matches('@').to_lowercase()
}

pub struct Deduplicator {
    rules: DedupRules,
}

impl Deduplicator {
    pub fn new(rules: DedupRules) -> Self {
        Self { rules }
    }

    pub fn is_duplicate(&self, a: &EventRecord, b: &EventRecord) -> bool {
        let (Some(name_a), Some(name_b)) = (a.name.as_deref(), b.name.as_deref()) else {
            return false;
        };
        let similarity = strsim::jaro_winkler(&name_key(name_a), &name_key(name_b));
        if similarity < self.rules.name_similarity {
            return false;
        }

        if self.rules.same_day_required {
            match (a.date_time, b.date_time) {
                (Some(x), Some(y)) if x.date() == y.date() => {}
                _ => return false,
            }
        }

        if self.rules.organizer_must_match {
            match (a.organizer.as_deref(), b.organizer.as_deref()) {
                (Some(x), Some(y)) if organizer_key(x) == organizer_key(y) => {}
                _ => return false,
            }
        }

        true
    }

    /// Collapse duplicates into the earliest record of each group.
    pub fn deduplicate(&self, events: Vec<EventRecord>) -> Vec<EventRecord> {
        let mut kept: Vec<EventRecord> = Vec::with_capacity(events.len());
        for event in events {
            match kept.iter_mut().find(|k| self.is_duplicate(k, &event)) {
                Some(existing) => {
                    debug!(
                        "Merging duplicate '{}' into '{}'",
                        event.display_name(),
                        existing.display_name()
                    );
                    merge(existing, event);
                }
                None => kept.push(event),
            }
        }
        kept
    }
}

/// Fill gaps in `into` from `other`; the longer description wins; hashtags union.
pub fn merge(into: &mut EventRecord, other: EventRecord) {
    if into.name.is_none() {
        into.name = other.name;
    }
    if into.date_time.is_none() {
        into.date_time = other.date_time;
    }
    if into.organizer.is_none() {
        into.organizer = other.organizer;
    }
    if into.location.is_none() {
        into.location = other.location;
    }
    if into.source_url.is_none() {
        into.source_url = other.source_url;
    }
    let longer = match (&into.description, &other.description) {
        (Some(mine), Some(theirs)) => theirs.chars().count() > mine.chars().count(),
        (None, Some(_)) => true,
        _ => false,
    };
    if longer {
        into.description = other.description;
    }
    for tag in other.hashtags {
        into.add_hashtag(tag);
    }
    into.is_regular |= other.is_regular;
    if into.frequency.is_none() {
        into.frequency = other.frequency;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, 5, d).and_then(|date| date.and_hms_opt(h, 0, 0))
    }

    fn event(name: &str, when: Option<NaiveDateTime>) -> EventRecord {
        EventRecord {
            name: Some(name.into()),
            date_time: when,
            ..EventRecord::default()
        }
    }

    #[test]
    fn merges_similar_names_on_same_day() {
        let first = EventRecord {
            description: Some("short".into()),
            hashtags: vec!["#jazz".into()],
            ..event("Jazz Night Vol.12", at(10, 21))
        };
        let second = EventRecord {
            location: Some("Jazz Lounge".into()),
            description: Some("a much longer description".into()),
            hashtags: vec!["#jazz".into(), "#vrchat".into()],
            ..event("Jazz Night Vol.12!", at(10, 22))
        };
        let out = Deduplicator::new(DedupRules::default()).deduplicate(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name.as_deref(), Some("Jazz Night Vol.12"));
        assert_eq!(out[0].location.as_deref(), Some("Jazz Lounge"));
        assert_eq!(out[0].description.as_deref(), Some("a much longer description"));
        assert_eq!(out[0].hashtags, vec!["#jazz", "#vrchat"]);
    }

    #[test]
    fn keeps_different_days_apart() {
        let out = Deduplicator::new(DedupRules::default())
            .deduplicate(vec![event("Jazz Night", at(10, 21)), event("Jazz Night", at(17, 21))]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn keeps_different_names_apart() {
        let out = Deduplicator::new(DedupRules::default())
            .deduplicate(vec![event("Jazz Night", at(10, 21)), event("Poetry Club", at(10, 21))]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn organizer_rule_when_enabled() {
        let rules = DedupRules {
            organizer_must_match: true,
            ..DedupRules::default()
        };
        let a = EventRecord {
            organizer: Some("@Host".into()),
            ..event("Jazz Night", at(10, 21))
        };
        let b = EventRecord {
            organizer: Some("host".into()),
            ..event("Jazz Night", at(10, 21))
        };
        let c = EventRecord {
            organizer: Some("@other".into()),
            ..event("Jazz Night", at(10, 21))
        };
        let dedup = Deduplicator::new(rules);
        assert!(dedup.is_duplicate(&a, &b));
        assert!(!dedup.is_duplicate(&a, &c));
    }
}
