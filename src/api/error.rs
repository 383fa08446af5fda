use crate::config::NOT_CONFIGURED_MESSAGE;
use crate::services::storage::StorageError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Body of every failed JSON response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    ConfigurationMissing,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        source: StorageError,
    },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Storage failure reported with a fixed message; details only reach the log.
    pub fn storage(source: StorageError, message: &str) -> Self {
        AppError::Storage {
            message: message.to_string(),
            source,
        }
    }

    /// Storage failure that passes the store's own message through when it
    /// sent one, falling back to `fallback` otherwise.
    pub fn storage_passthrough(source: StorageError, fallback: &str) -> Self {
        let message = source
            .service_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string());
        AppError::Storage { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ConfigurationMissing | AppError::Storage { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::ConfigurationMissing => {
                tracing::error!("Storage request rejected: B2 is not configured");
                NOT_CONFIGURED_MESSAGE.to_string()
            }
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::PayloadTooLarge(msg) => {
                msg
            }
            AppError::Storage { message, source } => {
                tracing::error!(error = %source, "{}", message);
                message
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
