//! Turns collected records into validated events.

pub mod extractor;
pub mod normalize;
pub mod url_expander;
pub mod validator;

use chrono::NaiveDate;
use evcal_common::event::EventRecord;
use evcal_common::record::RawRecord;
use extractor::EventExtractor;
use tracing::{debug, info, warn};
use url_expander::UrlExpander;
use validator::{SchemaValidator, SchemaViolation};

pub use normalize::normalize_text;

/// An event that failed validation, with the reasons.
#[derive(Debug, Clone)]
pub struct Rejected {
    pub event: EventRecord,
    pub violations: Vec<SchemaViolation>,
}

#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub valid: Vec<EventRecord>,
    pub rejected: Vec<Rejected>,
}

/// Extraction followed by validation over a batch of raw records.
pub struct Processor {
    extractor: EventExtractor,
    validator: SchemaValidator,
    expander: Option<UrlExpander>,
}

impl Processor {
    pub fn new(
        extractor: EventExtractor,
        validator: SchemaValidator,
        expander: Option<UrlExpander>,
    ) -> Self {
        Self {
            extractor,
            validator,
            expander,
        }
    }

    pub async fn process(&mut self, records: &[RawRecord], today: NaiveDate) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        for record in records {
            let mut event = self.extractor.extract(record, today);
            if let (Some(expander), Some(description)) = (self.expander.as_mut(), &event.description) {
                event.description = Some(expander.expand_text(description).await);
            }

            let violations = self.validator.validate(&event);
            if violations.is_empty() {
                outcome.valid.push(event);
            } else {
                debug!(
                    "Rejected record {}: {}",
                    record.key(),
                    violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                outcome.rejected.push(Rejected { event, violations });
            }
        }

        if outcome.valid.is_empty() && !records.is_empty() {
            warn!("None of {} records produced a valid event", records.len());
        }
        info!(
            "Processed {} records: {} valid, {} rejected",
            records.len(),
            outcome.valid.len(),
            outcome.rejected.len()
        );
        outcome
    }
}
