use anyhow::Result;
use reqwest::Method;

use super::client::ApiClient;
use crate::models::{Post, PostList, PostPayload};

/// Page size the web listing uses
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Post listing and authoring over an `ApiClient`.
#[derive(Clone)]
pub struct PostsService {
    api: ApiClient,
}

impl PostsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch one page of published posts
    pub async fn list_posts(&self, limit: u32, offset: u32) -> Result<PostList> {
        self.page("/posts", limit, offset).await
    }

    /// Fetch one page of the logged in user's own posts, drafts included
    pub async fn my_posts(&self, limit: u32, offset: u32) -> Result<PostList> {
        self.page("/posts/me", limit, offset).await
    }

    pub async fn get_post(&self, id: &str) -> Result<Post> {
        self.api.get_json(&format!("/posts/{}", id)).await
    }

    pub async fn create_post(&self, payload: &PostPayload) -> Result<Post> {
        self.api.post_json("/posts", payload).await
    }

    pub async fn update_post(&self, id: &str, payload: &PostPayload) -> Result<Post> {
        self.api.patch_json(&format!("/posts/{}", id), payload).await
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/posts/{}", id)).await
    }

    async fn page(&self, path: &str, limit: u32, offset: u32) -> Result<PostList> {
        let request = self
            .api
            .request(Method::GET, path)
            .query(&[("limit", limit), ("offset", offset)]);
        self.api.fetch_json(request).await
    }
}
