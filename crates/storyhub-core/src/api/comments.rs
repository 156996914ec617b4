use anyhow::Result;
use serde::Serialize;

use super::client::ApiClient;
use crate::models::{Comment, CommentList};

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    content: &'a str,
}

/// Comments on posts over an `ApiClient`.
#[derive(Clone)]
pub struct CommentsService {
    api: ApiClient,
}

impl CommentsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let list: CommentList = self.api.get_json(&format!("/posts/{}/comments", post_id)).await?;
        Ok(list.items)
    }

    pub async fn create_comment(&self, post_id: &str, content: &str) -> Result<Comment> {
        self.api
            .post_json(&format!("/posts/{}/comments", post_id), &CommentRequest { content })
            .await
    }

    /// Comments are deleted by id, outside the post path
    pub async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.api.delete(&format!("/comments/{}", comment_id)).await
    }
}
