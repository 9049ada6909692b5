use crate::model::{HitEvent, TrackingRecord, UserAccount};
use crate::store::{CredentialStore, StoreError, TrackingStore};
use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Error, FromRow, PgPool};
use std::collections::HashMap;

#[derive(FromRow)]
struct HitRow {
    record_id: String,
    #[sqlx(flatten)]
    hit: HitEvent,
}

pub struct PgStore {
    db_connection_pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let db_connection_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(db_connection_pool))
    }

    pub fn from_pool(db_connection_pool: PgPool) -> Self {
        Self { db_connection_pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.db_connection_pool)
            .await?;
        Ok(())
    }

    async fn hits_of(&self, record_id: &str) -> Result<Vec<HitEvent>, Error> {
        sqlx::query_as(
            r#"
              select source_address, client_signature, observed_at
              from hit_events
              where record_id = $1
              order by seq
            "#,
        )
        .bind(record_id)
        .fetch_all(&self.db_connection_pool)
        .await
    }
}

fn map_unique_violation(err: Error, key: &str) -> StoreError {
    match err {
        Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation => {
            StoreError::Duplicate(key.to_string())
        }
        err => StoreError::Database(err),
    }
}

#[async_trait]
impl TrackingStore for PgStore {
    async fn create(&self, record: &TrackingRecord) -> Result<(), StoreError> {
        sqlx::query("insert into tracking_records(id, label, created_at) values ($1, $2, $3)")
            .bind(&record.id)
            .bind(&record.label)
            .bind(record.created_at)
            .execute(&self.db_connection_pool)
            .await
            .map_err(|err| map_unique_violation(err, &record.id))?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TrackingRecord>, StoreError> {
        let record: Option<TrackingRecord> =
            sqlx::query_as("select id, label, created_at from tracking_records where id = $1")
                .bind(id)
                .fetch_optional(&self.db_connection_pool)
                .await?;
        match record {
            Some(mut record) => {
                record.hits = self.hits_of(&record.id).await?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<TrackingRecord>, StoreError> {
        let mut records: Vec<TrackingRecord> = sqlx::query_as(
            "select id, label, created_at from tracking_records order by created_at, id",
        )
        .fetch_all(&self.db_connection_pool)
        .await?;

        let rows: Vec<HitRow> = sqlx::query_as(
            r#"
              select record_id, source_address, client_signature, observed_at
              from hit_events
              order by seq
            "#,
        )
        .fetch_all(&self.db_connection_pool)
        .await?;

        let mut hits: HashMap<String, Vec<HitEvent>> = HashMap::new();
        for row in rows {
            hits.entry(row.record_id).or_default().push(row.hit);
        }
        for record in &mut records {
            record.hits = hits.remove(&record.id).unwrap_or_default();
        }
        Ok(records)
    }

    async fn append_hit(&self, record_id: &str, hit: &HitEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
              insert into hit_events(record_id, source_address, client_signature, observed_at)
              values ($1, $2, $3, $4)
            "#,
        )
        .bind(record_id)
        .bind(&hit.source_address)
        .bind(&hit.client_signature)
        .bind(hit.observed_at)
        .execute(&self.db_connection_pool)
        .await
        .map_err(|err| match err {
            Error::Database(db_err) if db_err.kind() == ErrorKind::ForeignKeyViolation => {
                StoreError::UnknownRecord(record_id.to_string())
            }
            err => StoreError::Database(err),
        })?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        let account = sqlx::query_as(
            "select username, password_digest from user_accounts where username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db_connection_pool)
        .await?;
        Ok(account)
    }

    async fn create_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        sqlx::query("insert into user_accounts(username, password_digest) values ($1, $2)")
            .bind(&account.username)
            .bind(&account.password_digest)
            .execute(&self.db_connection_pool)
            .await
            .map_err(|err| map_unique_violation(err, &account.username))?;
        Ok(())
    }
}
