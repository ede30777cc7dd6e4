use serde::Serialize;

pub mod listing;

pub use listing::{filter_records, live_count, ListingView, SortKey};

/// Canonical representation of one channel returned by the remote API.
///
/// Only `username` is guaranteed. Every other field is present only when the
/// payload carried it with the expected type, so consumers must not read a
/// missing follower count as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamerRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Identity of a record: the numeric channel id, or the username when the
/// payload had no id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Id(u64),
    Username(String),
}

impl StreamerRecord {
    pub fn new<T: Into<String>>(username: T) -> Self {
        Self {
            id: None,
            username: username.into(),
            display_name: None,
            avatar: None,
            followers: None,
            is_live: None,
            game: None,
            category: None,
            title: None,
            viewers: None,
            language: None,
            tags: None,
        }
    }

    pub fn key(&self) -> RecordKey {
        match self.id {
            Some(id) => RecordKey::Id(id),
            None => RecordKey::Username(self.username.clone()),
        }
    }

    /// Name shown to users: the display name when known, else the username.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn is_live(&self) -> bool {
        self.is_live == Some(true)
    }

    /// Case-insensitive substring match on display name, game, category and tags.
    /// `needle` must already be lowercased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        let contains = |value: &Option<String>| {
            value
                .as_deref()
                .map(|text| text.to_lowercase().contains(needle))
                .unwrap_or(false)
        };

        contains(&self.display_name)
            || contains(&self.game)
            || contains(&self.category)
            || self
                .tags
                .as_ref()
                .map(|tags| tags.iter().any(|tag| tag.to_lowercase().contains(needle)))
                .unwrap_or(false)
    }
}
