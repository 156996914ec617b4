use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deserialize_id;

fn default_weight() -> i64 {
    1
}

fn default_active() -> bool {
    true
}

// Backend rows may carry an explicit `null` weight
fn deserialize_weight<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_else(default_weight))
}

/// An advertisement as served by the backend. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub advertiser_name: Option<String>,
    #[serde(default)]
    pub ad_content: Option<String>,
    pub destination_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default = "default_weight", deserialize_with = "deserialize_weight")]
    pub weight: i64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Advertisement {
    /// Whether the ad may be served at `now`: active and inside its
    /// `[start_at, end_at]` window (open ends allowed).
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        let starts_ok = self.start_at.map_or(true, |start| start <= now);
        let ends_ok = self.end_at.map_or(true, |end| end >= now);
        starts_ok && ends_ok
    }

    /// Weight used for selection. Zero and negative weights count as 1.
    pub fn effective_weight(&self) -> i64 {
        self.weight.max(1)
    }

    pub fn display_name(&self) -> &str {
        self.advertiser_name.as_deref().unwrap_or("Sponsored")
    }
}

/// One page of the `/ads` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdList {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    #[serde(default)]
    pub items: Vec<Advertisement>,
}

/// Body for the admin create/update endpoints. Unset fields are omitted,
/// so the same type serves as a partial update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertiser_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
}
