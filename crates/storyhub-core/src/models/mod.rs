//! Data models for storyhub entities.
//!
//! This module contains the data structures shared by the API client,
//! the session store and the ad selection helper:
//!
//! - `User`, `Role`: the authenticated user's profile
//! - `Advertisement`, `AdList`: ads served by the backend
//! - `Post`, `Comment`, `Notification`: content and activity
//! - `TokenPair`: login/refresh response body

pub mod advertisement;
pub mod comment;
pub mod notification;
pub mod post;
pub mod user;

pub use advertisement::{AdList, AdPayload, Advertisement};
pub use comment::{Comment, CommentList};
pub use notification::{Notification, NotificationList};
pub use post::{BookmarkList, Post, PostList, PostPayload, Tag, ToggleResponse};
pub use user::{Role, TokenPair, User, UserSummary};

// Helper to deserialize backend ids that may arrive as a string or a number
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct IdVisitor;

    impl<'de> de::Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
