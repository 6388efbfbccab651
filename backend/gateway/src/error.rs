use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use heartlog_core::HeartlogError;

use crate::identity::IdentityError;

/// Errors surfaced by HTTP handlers. All of them answer 500 with the error
/// text as the body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("sqlite error: {0}")]
    Store(#[from] HeartlogError),

    #[error("identity lookup failed: {0}")]
    Identity(#[from] IdentityError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
