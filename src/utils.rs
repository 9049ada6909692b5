use crate::error::AppError;
use axum::http::HeaderMap;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

pub async fn with_timeout<F: Future>(
    duration: Duration,
    task: F,
) -> Result<<F as Future>::Output, AppError> {
    timeout(duration, task)
        .await
        .map_err(|_| AppError::Timeout(duration))
}

/// Header bytes outside visible ASCII are decoded as ISO-8859-1, so an
/// opaque value is kept rather than blanked.
pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.as_bytes().iter().map(|&byte| char::from(byte)).collect())
}

/// 128-bit random tracking identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn generate_token() -> String {
    let random_bytes: [u8; 16] = rand::thread_rng().gen();
    BASE64_URL_SAFE_NO_PAD.encode(random_bytes)
}
