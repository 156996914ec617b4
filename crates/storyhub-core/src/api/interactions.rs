use anyhow::Result;
use serde_json::json;

use super::client::ApiClient;
use crate::models::{BookmarkList, Post, ToggleResponse};

/// Likes and bookmarks over an `ApiClient`. Both endpoints toggle: calling
/// twice restores the original state.
#[derive(Clone)]
pub struct InteractionsService {
    api: ApiClient,
}

impl InteractionsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn toggle_like(&self, post_id: &str) -> Result<ToggleResponse> {
        self.api.post_json(&format!("/posts/{}/like", post_id), &json!({})).await
    }

    pub async fn toggle_bookmark(&self, post_id: &str) -> Result<ToggleResponse> {
        self.api.post_json(&format!("/posts/{}/bookmark", post_id), &json!({})).await
    }

    /// Posts the logged in user has bookmarked
    pub async fn bookmarks(&self) -> Result<Vec<Post>> {
        let list: BookmarkList = self.api.get_json("/users/me/bookmarks").await?;
        Ok(list.items)
    }
}
