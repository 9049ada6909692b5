//! Storage seams for tracking records and user accounts.
//!
//! The HTTP layer only ever talks to [`TrackingStore`] and [`CredentialStore`].
//! [`crate::dao::PgStore`] backs them with PostgreSQL, [`MemoryStore`] keeps
//! everything in process and is used when no database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{HitEvent, TrackingRecord, UserAccount};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A primary key that must be unique is already taken
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// A hit was appended to a record that does not exist
    #[error("unknown tracking record: {0}")]
    UnknownRecord(String),
}

/// Tracking records and their hits. Records are write-once, hits append-only.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn create(&self, record: &TrackingRecord) -> Result<(), StoreError>;

    /// Returns the record with all of its hits in insertion order.
    async fn get_by_id(&self, id: &str) -> Result<Option<TrackingRecord>, StoreError>;

    /// All records ordered by creation time, each with its hits.
    async fn list_all(&self) -> Result<Vec<TrackingRecord>, StoreError>;

    async fn append_hit(&self, record_id: &str, hit: &HitEvent) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn create_user(&self, account: &UserAccount) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, TrackingRecord>,
    users: HashMap<String, UserAccount>,
}

/// In-process store. Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn create(&self, record: &TrackingRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        state.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TrackingRecord>, StoreError> {
        Ok(self.state.read().await.records.get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<TrackingRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<TrackingRecord> = state.records.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    async fn append_hit(&self, record_id: &str, hit: &HitEvent) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::UnknownRecord(record_id.to_string()))?;
        record.append_hit(hit.clone());
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.state.read().await.users.get(username).cloned())
    }

    async fn create_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&account.username) {
            return Err(StoreError::Duplicate(account.username.clone()));
        }
        state
            .users
            .insert(account.username.clone(), account.clone());
        Ok(())
    }
}
