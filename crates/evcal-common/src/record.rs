use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw material collected from the platform, before extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawRecord {
    Post(Post),
    ListMember(ListMember),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMember {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    pub scraped_at: DateTime<Utc>,
}

impl RawRecord {
    /// Free text the extractor works on.
    pub fn text(&self) -> &str {
        match self {
            RawRecord::Post(post) => &post.text,
            RawRecord::ListMember(member) => member.bio.as_deref().unwrap_or_default(),
        }
    }

    /// Account that produced the text, used as the fallback organizer.
    pub fn author(&self) -> Option<&str> {
        match self {
            RawRecord::Post(post) => post.author.as_deref(),
            RawRecord::ListMember(member) => Some(member.user_id.as_str()),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            RawRecord::Post(post) => post.url.as_deref(),
            RawRecord::ListMember(_) => None,
        }
    }

    /// Stable identity used to drop repeats across scroll pages.
    pub fn key(&self) -> &str {
        match self {
            RawRecord::Post(post) => &post.id,
            RawRecord::ListMember(member) => &member.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let record = RawRecord::ListMember(ListMember {
            user_id: "vket_official".into(),
            user_name: Some("Vket".into()),
            display_name: None,
            bio: None,
            is_verified: true,
            scraped_at: Utc::now(),
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["source"], "list_member");
        assert_eq!(record.text(), "");
        assert_eq!(record.author(), Some("vket_official"));
    }
}
