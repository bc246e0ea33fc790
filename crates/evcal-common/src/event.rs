use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recurrence pattern of a regular event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    /// RFC 5545 RRULE value.
    pub fn rrule(&self) -> &'static str {
        match self {
            Frequency::Weekly => "FREQ=WEEKLY",
            Frequency::Biweekly => "FREQ=WEEKLY;INTERVAL=2",
            Frequency::Monthly => "FREQ=MONTHLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

/// An event extracted from a post or profile.
///
/// Fields are optional because extraction is best-effort; the schema
/// validator decides which records are complete enough to keep.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, rename = "event_name", alias = "name")]
    pub name: Option<String>,
    #[serde(default)]
    pub date_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Insertion-ordered, no duplicates.
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub is_regular: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    /// Start of the series master this record was expanded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_of: Option<NaiveDateTime>,
}

impl EventRecord {
    /// Add a hashtag unless it is already present.
    pub fn add_hashtag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.hashtags.contains(&tag) {
            self.hashtags.push(tag);
        }
    }

    /// Generated instance of a regular event rather than the event itself.
    pub fn is_occurrence(&self) -> bool {
        self.occurrence_of.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(untitled)")
    }
}
