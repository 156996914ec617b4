use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, UserSummary};

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// A post as returned by `/posts`.
///
/// The backend sends `author_id`; some listings embed the author as `user`
/// and add the viewer's like/bookmark state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub header: Option<String>,
    pub content: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<u64>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    #[serde(default)]
    pub is_flagged: bool,
    #[serde(default)]
    pub is_liked_by_user: bool,
    #[serde(default)]
    pub is_bookmarked_by_user: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn author_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// One page of posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostList {
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub items: Vec<Post>,
}

/// Body for creating or partially updating a post
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// Result of toggling a like or a bookmark. Only the toggled flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub success: bool,
    #[serde(default)]
    pub liked: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkList {
    #[serde(default)]
    pub items: Vec<Post>,
}
