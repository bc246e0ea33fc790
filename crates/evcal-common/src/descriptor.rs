use serde::{Deserialize, Serialize};
use std::fmt;

/// How a text criterion is compared against an element's text or accessible name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole text must equal the criterion (after whitespace trimming).
    #[default]
    Exact,
    /// Case-insensitive substring match.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub text: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl TextMatch {
    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Exact,
        }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Partial,
        }
    }

    /// Whether `candidate` satisfies this criterion.
    pub fn matches(&self, candidate: &str) -> bool {
        match self.mode {
            MatchMode::Exact => candidate.trim() == self.text,
            MatchMode::Partial => candidate
                .to_lowercase()
                .contains(&self.text.to_lowercase()),
        }
    }
}

/// One fallback strategy for locating an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descriptor {
    /// `<tag name="value">`
    Attribute {
        tag: String,
        name: String,
        value: String,
    },
    /// ARIA role, optionally narrowed by accessible name.
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
    },
    Text(TextMatch),
    TestId { id: String },
}

impl Descriptor {
    pub fn input_attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Descriptor::Attribute {
            tag: "input".to_string(),
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn role(role: impl Into<String>) -> Self {
        Descriptor::Role {
            role: role.into(),
            name: None,
        }
    }

    pub fn role_named(role: impl Into<String>, name: TextMatch) -> Self {
        Descriptor::Role {
            role: role.into(),
            name: Some(name),
        }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Descriptor::TestId { id: id.into() }
    }

    /// CSS selector equivalent, when one exists.
    ///
    /// Role and text descriptors need name computation and cannot be expressed
    /// as plain CSS.
    pub fn css(&self) -> Option<String> {
        match self {
            Descriptor::Attribute { tag, name, value } => Some(format!(
                "{}[{}=\"{}\"]",
                tag,
                name,
                escape_css_string(value)
            )),
            Descriptor::TestId { id } => Some(format!("[data-testid=\"{}\"]", escape_css_string(id))),
            _ => None,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Attribute { tag, name, value } => write!(f, "{}[{}='{}']", tag, name, value),
            Descriptor::Role { role, name: None } => write!(f, "Role='{}'", role),
            Descriptor::Role {
                role,
                name: Some(name),
            } => write!(f, "Role='{}', {}", role, name),
            Descriptor::Text(text) => write!(f, "{}", text),
            Descriptor::TestId { id } => write!(f, "Data-testid='{}'", id),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            MatchMode::Exact => write!(f, "Text='{}' (Exact)", self.text),
            MatchMode::Partial => write!(f, "Text~'{}' (Case-Insensitive)", self.text),
        }
    }
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Opaque reference to a located element.
///
/// Only meaningful to the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: u32,
    pub descriptor: Descriptor,
}

/// Ordered attribute name → acceptable values mapping.
///
/// Iteration order is insertion order, attribute-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCandidates {
    entries: Vec<(String, Vec<String>)>,
}

impl AttributeCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values for an attribute. Values for an attribute that is
    /// already present are appended to its existing list.
    pub fn with<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attribute = attribute.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(name, _)| *name == attribute) {
            Some((_, existing)) => existing.extend(values),
            None => self.entries.push((attribute, values)),
        }
        self
    }

    /// Total number of attribute/value pairs.
    pub fn attempts(&self) -> usize {
        self.entries.iter().map(|(_, values)| values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts() == 0
    }

    /// Flattened `(attribute, value)` pairs in search order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }
}
