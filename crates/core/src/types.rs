use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Known statuses keyed by user identifier.
pub type StatusMap = HashMap<String, UserStatus>;

/// Presence reported by the chat server for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub manual: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_activity_at: i64,
}

impl UserStatus {
    /// Returns `true` when the server actually reported a status value.
    pub fn is_known(&self) -> bool {
        !self.status.is_empty()
    }

    /// Converts `last_activity_at` into a UTC timestamp. Zero means "never seen".
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        if self.last_activity_at <= 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.last_activity_at).single()
    }
}

/// Minimal user profile; only the identifier matters for status loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
        }
    }
}

/// A post in the current channel. An empty `user_id` means the post has no author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
}

/// Direct channel show preference. `name` holds the other participant's id and
/// `value` is a stringified boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub name: String,
    pub value: String,
}

impl Preference {
    pub fn direct_show(other_user_id: impl Into<String>, visible: bool) -> Self {
        Self {
            category: Some("direct_channel_show".to_string()),
            name: other_user_id.into(),
            value: visible.to_string(),
        }
    }

    /// Only the exact string `"true"` marks the conversation as visible.
    pub fn is_enabled(&self) -> bool {
        self.value == "true"
    }
}

/// Read-only snapshot of the client state consumed by the status loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub posts_in_channel: Option<Vec<Post>>,
    #[serde(default)]
    pub post_visibility: HashMap<String, usize>,
    #[serde(default)]
    pub direct_show_preferences: Vec<Preference>,
    #[serde(default)]
    pub current_user_id: String,
    #[serde(default)]
    pub status_feature_enabled: bool,
    #[serde(default)]
    pub current_status_map: StatusMap,
}

impl StateView {
    /// Number of posts rendered in the current channel; missing counts are zero.
    pub fn visible_post_count(&self) -> usize {
        self.post_visibility
            .get(&self.channel_id)
            .copied()
            .unwrap_or(0)
    }

    /// Returns `true` when a non-empty status is already known for `user_id`.
    pub fn has_status(&self, user_id: &str) -> bool {
        self.current_status_map
            .get(user_id)
            .map(UserStatus::is_known)
            .unwrap_or(false)
    }
}

/// Profiles handed to the map loader, either keyed by user id or as a plain list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileCollection {
    KeyedById(BTreeMap<String, UserProfile>),
    OrderedList(Vec<UserProfile>),
}

impl ProfileCollection {
    /// Extracts user ids: map keys for keyed collections, profile ids for lists.
    pub fn user_ids(&self) -> Vec<String> {
        match self {
            Self::KeyedById(profiles) => profiles.keys().cloned().collect(),
            Self::OrderedList(profiles) => profiles.iter().map(|p| p.id.clone()).collect(),
        }
    }
}

/// Outcome of a loader call: `data` is `true` only when a fetch was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    pub data: bool,
}

impl LoadResult {
    pub const DISPATCHED: Self = Self { data: true };
    pub const SKIPPED: Self = Self { data: false };

    pub fn dispatched(self) -> bool {
        self.data
    }
}
