use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("{0}")]
    DetectionFailure(String),

    #[error("Constellation not found")]
    NotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelUnavailable | ApiError::DetectionFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Short label used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::ModelUnavailable => "model_unavailable",
            ApiError::DetectionFailure(_) => "detection_failure",
            ApiError::NotFound => "not_found",
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::DetectionFailure(format!("{:#}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        let body = match self {
            ApiError::DetectionFailure(_) => {
                tracing::error!(error = %message, "Error during prediction");
                json!({ "error": message, "success": false })
            }
            _ => {
                tracing::debug!(status = status.as_u16(), error = %message, "Request rejected");
                json!({ "error": message })
            }
        };

        (status, Json(body)).into_response()
    }
}
