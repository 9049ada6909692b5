//! Link generation and pixel hit recording.
//!
//! Both operations are independent of HTTP: callers pass the store, the
//! caller's [`Session`], the relevant request metadata and the current time.

use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::timeout;

use crate::auth::Session;
use crate::model::{HitEvent, TrackingRecord};
use crate::store::{StoreError, TrackingStore};
use crate::utils::{generate_id, get_header};

pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
pub const CLIENT_SIGNATURE_HEADER: &str = "User-Agent";

#[derive(Debug, Error)]
pub enum TrackError {
    /// Absent, empty or unknown identifier, or an unusable request.
    #[error("bad request")]
    BadRequest,

    #[error("record lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// The parts of an inbound pixel request that end up in a hit.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub forwarded_for: Option<String>,
    pub client_signature: Option<String>,
}

impl RequestContext {
    /// The forwarded address is taken verbatim; no trusted-proxy check is made.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            forwarded_for: get_header(FORWARDED_FOR_HEADER, headers),
            client_signature: get_header(CLIENT_SIGNATURE_HEADER, headers),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PixelServed {
    /// A logged-in user fetched the pixel; nothing was stored.
    Preview,
    Recorded(HitEvent),
}

pub async fn generate(
    store: &dyn TrackingStore,
    label: &str,
    now: DateTime<Utc>,
) -> Result<TrackingRecord, StoreError> {
    let record = TrackingRecord::new(generate_id(), label.to_string(), now);
    store.create(&record).await?;
    tracing::info!("Generated tracking link {} ({:?})", record.id, record.label);
    Ok(record)
}

/// Only the record lookup is bounded by `lookup_timeout`. Once a hit has been
/// handed to the store it is never abandoned, so a slow write cannot end in an
/// error response for a hit that is stored anyway.
pub async fn serve_pixel(
    store: &dyn TrackingStore,
    id: Option<&str>,
    session: &Session,
    request: &RequestContext,
    now: DateTime<Utc>,
    lookup_timeout: Duration,
) -> Result<PixelServed, TrackError> {
    let id = id.filter(|id| !id.is_empty()).ok_or(TrackError::BadRequest)?;
    let record = timeout(lookup_timeout, store.get_by_id(id))
        .await
        .map_err(|_| TrackError::Timeout(lookup_timeout))??;
    let record = record.ok_or_else(|| {
        tracing::debug!("Pixel requested for unknown id {:?}", id);
        TrackError::BadRequest
    })?;

    if session.is_authenticated() {
        return Ok(PixelServed::Preview);
    }

    let client_signature = request
        .client_signature
        .clone()
        .ok_or(TrackError::BadRequest)?;
    let hit = HitEvent {
        source_address: request.forwarded_for.clone(),
        client_signature,
        observed_at: now,
    };
    store.append_hit(&record.id, &hit).await?;
    tracing::debug!("Recorded hit for {}", record.id);
    Ok(PixelServed::Recorded(hit))
}
