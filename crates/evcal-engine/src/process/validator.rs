use chrono::NaiveDateTime;
use evcal_common::event::EventRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Expected JSON shape of one event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    /// String holding an ISO-8601 local date-time.
    DateTime,
    StringArray,
    Boolean,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::String => "string",
            FieldKind::DateTime => "date-time string",
            FieldKind::StringArray => "array of strings",
            FieldKind::Boolean => "boolean",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSchema {
    #[serde(default = "default_required")]
    pub required: Vec<String>,
    #[serde(default = "default_properties")]
    pub properties: BTreeMap<String, FieldKind>,
}

impl Default for EventSchema {
    fn default() -> Self {
        Self {
            required: default_required(),
            properties: default_properties(),
        }
    }
}

fn default_required() -> Vec<String> {
    ["event_name", "date_time", "organizer", "location"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_properties() -> BTreeMap<String, FieldKind> {
    BTreeMap::from([
        ("event_name".to_string(), FieldKind::String),
        ("date_time".to_string(), FieldKind::DateTime),
        ("organizer".to_string(), FieldKind::String),
        ("location".to_string(), FieldKind::String),
        ("hashtags".to_string(), FieldKind::StringArray),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    Missing { field: String },
    WrongType { field: String, expected: FieldKind },
    /// The record could not be turned into a JSON object at all.
    NotAnObject,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::Missing { field } => write!(f, "'{}' is required", field),
            SchemaViolation::WrongType { field, expected } => {
                write!(f, "'{}' must be a {}", field, expected)
            }
            SchemaViolation::NotAnObject => f.write_str("record is not an object"),
        }
    }
}

pub struct SchemaValidator {
    schema: EventSchema,
}

impl SchemaValidator {
    pub fn new(schema: EventSchema) -> Self {
        Self { schema }
    }

    /// Every way `event` falls short of the schema; empty means valid.
    pub fn validate(&self, event: &EventRecord) -> Vec<SchemaViolation> {
        match serde_json::to_value(event) {
            Ok(value) => self.validate_value(&value),
            Err(_) => vec![SchemaViolation::NotAnObject],
        }
    }

    pub fn validate_value(&self, value: &Value) -> Vec<SchemaViolation> {
        let Some(object) = value.as_object() else {
            return vec![SchemaViolation::NotAnObject];
        };
        let mut violations = Vec::new();

        for field in &self.schema.required {
            if object.get(field).is_none_or(Value::is_null) {
                violations.push(SchemaViolation::Missing {
                    field: field.clone(),
                });
            }
        }

        for (field, kind) in &self.schema.properties {
            let Some(value) = object.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if !matches_kind(value, *kind) {
                violations.push(SchemaViolation::WrongType {
                    field: field.clone(),
                    expected: *kind,
                });
            }
        }

        violations
    }

    pub fn is_valid(&self, event: &EventRecord) -> bool {
        self.validate(event).is_empty()
    }
}

fn matches_kind(value: &Value, kind: FieldKind) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::DateTime => value
            .as_str()
            .is_some_and(|s| s.parse::<NaiveDateTime>().is_ok()),
        FieldKind::StringArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Boolean => value.is_boolean(),
    }
}
