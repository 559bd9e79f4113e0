use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Error taxonomy for the request pipeline. Validation and malformed-body
/// failures carry a client-facing message; upstream failures carry a generic
/// localized message for the client and keep the underlying cause for the
/// server log only.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    MalformedRequest(String),

    #[error("{user_message}")]
    Upstream { user_message: String, detail: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn upstream(user_message: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::Upstream {
            user_message: user_message.into(),
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } | ApiError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream { detail, .. } => error!("upstream failure: {detail}"),
            ApiError::Configuration(message) => error!("configuration failure: {message}"),
            ApiError::MalformedRequest(message) => warn!("malformed request: {message}"),
            ApiError::Validation(_) => {}
        }

        let body = json!({ "success": false, "error": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
