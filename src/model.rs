use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub hits: Vec<HitEvent>,
}

impl TrackingRecord {
    pub fn new(id: String, label: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            label,
            created_at,
            hits: Vec::new(),
        }
    }

    /// Hits only ever grow at the end; this is the single way to add one.
    pub fn append_hit(&mut self, hit: HitEvent) {
        self.hits.push(hit);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HitEvent {
    pub source_address: Option<String>,
    pub client_signature: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserAccount {
    pub username: String,
    pub password_digest: String,
}

#[derive(Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub label: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PixelQuery {
    pub utm_id: Option<String>,
}
