use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;
use crate::tracker::TrackError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, empty or unknown tracking identifier. One message for all of them.
    #[error("Bad Request")]
    BadRequest,

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TrackError> for AppError {
    fn from(err: TrackError) -> Self {
        match err {
            TrackError::BadRequest => AppError::BadRequest,
            TrackError::Timeout(duration) => AppError::Timeout(duration),
            TrackError::Storage(err) => AppError::Storage(err),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(err) => AppError::Storage(err),
            // recovered by the login route; anything reaching here is a server fault
            err => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            err => {
                tracing::error!("{}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                )
                    .into_response()
            }
        }
    }
}
