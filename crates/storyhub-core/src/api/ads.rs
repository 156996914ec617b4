use anyhow::Result;
use reqwest::Method;
use tracing::{debug, warn};

use super::client::ApiClient;
use crate::ads::pick_ad;
use crate::models::{AdList, AdPayload, Advertisement};

/// Number of candidates fetched to fill an ad slot
pub const DEFAULT_SLOT_LIMIT: u32 = 20;

/// Ad listing and admin management over an `ApiClient`.
#[derive(Clone)]
pub struct AdsService {
    api: ApiClient,
}

impl AdsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch one page of ads
    pub async fn fetch_ads(&self, limit: u32, offset: u32) -> Result<AdList> {
        let request = self
            .api
            .request(Method::GET, "/ads")
            .query(&[("limit", limit), ("offset", offset)]);
        self.api.fetch_json(request).await
    }

    pub async fn fetch_ad(&self, id: &str) -> Result<Advertisement> {
        self.api.get_json(&format!("/ads/{}", id)).await
    }

    /// Fill an ad slot: fetch the first `limit` ads and pick one.
    /// A failed fetch leaves the slot empty.
    pub async fn pick_slot_ad(&self, limit: u32) -> Option<Advertisement> {
        match self.fetch_ads(limit, 0).await {
            Ok(list) => {
                let picked = pick_ad(&list.items).cloned();
                debug!(candidates = list.items.len(), picked = ?picked.as_ref().map(|a| &a.id), "Picked slot ad");
                picked
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch ads for slot");
                None
            }
        }
    }

    pub async fn admin_create_ad(&self, payload: &AdPayload) -> Result<Advertisement> {
        self.api.post_json("/admin/ads", payload).await
    }

    pub async fn admin_update_ad(&self, id: &str, payload: &AdPayload) -> Result<Advertisement> {
        self.api.patch_json(&format!("/admin/ads/{}", id), payload).await
    }

    pub async fn admin_delete_ad(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/admin/ads/{}", id)).await
    }
}
