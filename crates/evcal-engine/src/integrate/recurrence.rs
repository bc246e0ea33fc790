use chrono::{Duration as ChronoDuration, Months, NaiveDateTime};
use evcal_common::event::{EventRecord, Frequency};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRules {
    /// How far past the reference time instances are generated.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
    #[serde(default = "default_weekly")]
    pub weekly_keywords: Vec<String>,
    #[serde(default = "default_biweekly")]
    pub biweekly_keywords: Vec<String>,
    #[serde(default = "default_monthly")]
    pub monthly_keywords: Vec<String>,
}

impl Default for RecurrenceRules {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            weekly_keywords: default_weekly(),
            biweekly_keywords: default_biweekly(),
            monthly_keywords: default_monthly(),
        }
    }
}

fn default_horizon_days() -> i64 {
    60
}

fn default_weekly() -> Vec<String> {
    ["毎週", "weekly", "every week"].map(String::from).to_vec()
}

fn default_biweekly() -> Vec<String> {
    ["隔週", "biweekly", "bi-weekly", "every other week"]
        .map(String::from)
        .to_vec()
}

fn default_monthly() -> Vec<String> {
    ["毎月", "monthly", "every month"].map(String::from).to_vec()
}

pub struct RecurrenceHandler {
    rules: RecurrenceRules,
}

impl RecurrenceHandler {
    pub fn new(rules: RecurrenceRules) -> Self {
        Self { rules }
    }

    /// Recurrence pattern named in the event's name or description.
    pub fn detect(&self, event: &EventRecord) -> Option<Frequency> {
        let haystack = format!(
            "{}\n{}",
            event.name.as_deref().unwrap_or_default(),
            event.description.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        let mentions = |keywords: &[String]| {
            keywords
                .iter()
                .any(|k| haystack.contains(&k.to_lowercase()))
        };

        // "bi-weekly" contains "weekly", so the narrower pattern goes first.
        if mentions(&self.rules.biweekly_keywords) {
            Some(Frequency::Biweekly)
        } else if mentions(&self.rules.weekly_keywords) {
            Some(Frequency::Weekly)
        } else if mentions(&self.rules.monthly_keywords) {
            Some(Frequency::Monthly)
        } else {
            None
        }
    }

    /// Mark regular events and add their future instances up to the horizon.
    /// Instances point back at their master through `occurrence_of`.
    /// Non-recurring events pass through untouched.
    pub fn expand(&self, events: Vec<EventRecord>, now: NaiveDateTime) -> Vec<EventRecord> {
        let horizon = now + ChronoDuration::days(self.rules.horizon_days);
        let mut out = Vec::with_capacity(events.len());

        for mut event in events {
            let Some(frequency) = event.frequency.or_else(|| self.detect(&event)) else {
                out.push(event);
                continue;
            };
            event.is_regular = true;
            event.frequency = Some(frequency);

            let instances = match event.date_time {
                Some(start) => occurrences(start, frequency, now, horizon),
                None => Vec::new(),
            };
            debug!(
                "'{}' repeats {}: {} future instances",
                event.display_name(),
                frequency,
                instances.len()
            );
            for when in instances {
                out.push(EventRecord {
                    date_time: Some(when),
                    occurrence_of: event.date_time,
                    ..event.clone()
                });
            }
            out.push(event);
        }

        out.sort_by_key(|e| e.date_time);
        out
    }
}

/// Start times after `start` that fall within `[now, horizon]`.
pub fn occurrences(
    start: NaiveDateTime,
    frequency: Frequency,
    now: NaiveDateTime,
    horizon: NaiveDateTime,
) -> Vec<NaiveDateTime> {
    let mut out = Vec::new();
    for n in 1u32.. {
        let next = match frequency {
            Frequency::Weekly => start.checked_add_signed(ChronoDuration::weeks(i64::from(n))),
            Frequency::Biweekly => start.checked_add_signed(ChronoDuration::weeks(2 * i64::from(n))),
            Frequency::Monthly => start.checked_add_months(Months::new(n)),
        };
        let Some(next) = next else { break };
        if next > horizon {
            break;
        }
        if next >= now {
            out.push(next);
        }
    }
    out
}
