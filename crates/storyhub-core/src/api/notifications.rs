use anyhow::Result;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::client::ApiClient;
use crate::models::{Notification, NotificationList};

const NOTIFICATIONS_PATH: &str = "/me/notifications";

#[derive(Debug, Deserialize)]
struct ReadAllResponse {
    #[serde(default)]
    updated: u64,
}

/// The logged in user's notifications over an `ApiClient`.
#[derive(Clone)]
pub struct NotificationsService {
    api: ApiClient,
}

impl NotificationsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, unread_only: bool, limit: u32, offset: u32) -> Result<NotificationList> {
        let request = self
            .api
            .request(Method::GET, NOTIFICATIONS_PATH)
            .query(&[("limit", limit), ("offset", offset)])
            .query(&[("unread_only", unread_only)]);
        self.api.fetch_json(request).await
    }

    /// Number of unread notifications, from the total of a one-item page
    pub async fn unread_count(&self) -> Result<u64> {
        Ok(self.list(true, 1, 0).await?.total)
    }

    pub async fn mark_read(&self, id: &str) -> Result<Notification> {
        self.api
            .post_json(&format!("{}/{}/read", NOTIFICATIONS_PATH, id), &json!({}))
            .await
    }

    /// Mark everything read; returns how many notifications changed
    pub async fn mark_all_read(&self) -> Result<u64> {
        let response: ReadAllResponse = self
            .api
            .post_json(&format!("{}/read_all", NOTIFICATIONS_PATH), &json!({}))
            .await?;
        debug!(updated = response.updated, "Marked notifications read");
        Ok(response.updated)
    }
}
