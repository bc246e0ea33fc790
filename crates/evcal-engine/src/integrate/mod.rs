pub mod dedup;
pub mod recurrence;

use chrono::NaiveDateTime;
use dedup::Deduplicator;
use evcal_common::event::EventRecord;
use recurrence::RecurrenceHandler;
use tracing::info;

pub use dedup::DedupRules;
pub use recurrence::RecurrenceRules;

/// Deduplicate, then expand recurring events.
pub struct Integrator {
    dedup: Deduplicator,
    recurrence: RecurrenceHandler,
}

impl Integrator {
    pub fn new(dedup: DedupRules, recurrence: RecurrenceRules) -> Self {
        Self {
            dedup: Deduplicator::new(dedup),
            recurrence: RecurrenceHandler::new(recurrence),
        }
    }

    pub fn integrate(&self, events: Vec<EventRecord>, now: NaiveDateTime) -> Vec<EventRecord> {
        let incoming = events.len();
        let unique = self.dedup.deduplicate(events);
        let merged = incoming - unique.len();
        let expanded = self.recurrence.expand(unique, now);
        info!(
            "Integrated {} events: {} duplicates merged, {} after recurrence expansion",
            incoming,
            merged,
            expanded.len()
        );
        expanded
    }
}
