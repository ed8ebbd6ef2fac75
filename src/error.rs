use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::order::ValidationError;
use crate::models::ErrorResponse;
use crate::services::notifier::NotifyError;

pub const RETRY_LATER: &str = "Could not deliver your order. Please try again later.";
pub const SERVER_ERROR: &str = "Internal server error. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body is too large")]
    PayloadTooLarge,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("every notification channel failed")]
    AllChannelsFailed,

    #[error("notification failed: {0}")]
    NotificationFailed(NotifyError),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "API endpoint not found".to_string()),
            AppError::AllChannelsFailed | AppError::NotificationFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, RETRY_LATER.to_string())
            }
            AppError::Internal(_) | AppError::Anyhow(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %self);
        } else {
            tracing::debug!(%status, error = %self);
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
