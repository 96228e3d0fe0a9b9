//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use migrator_engine::Error as EngineError;
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Engine(e) => match e {
                EngineError::RecordNotFound(_) | EngineError::UnknownCollection(_) => {
                    StatusCode::NOT_FOUND
                }
                EngineError::NotPermitted(_) => StatusCode::FORBIDDEN,
                EngineError::Remote(_)
                | EngineError::Attachment(_)
                | EngineError::AttachmentTooLarge { .. } => StatusCode::BAD_GATEWAY,
                // Payloads are built from stored records, never from request bodies.
                EngineError::Local(_) | EngineError::Cache(_) | EngineError::InvalidPayload(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Engine(e) if status.is_server_error() => {
                tracing::error!("Engine error: {:?}", e);
                ("Sync failed".to_string(), Some(e.to_string()))
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (e.to_string(), None)
            }
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                ("Internal server error".to_string(), None)
            }
            AppError::BadRequest(message) | AppError::NotFound(message) => (message.clone(), None),
            AppError::Unauthorized(reason) => ("Unauthorized".to_string(), Some(reason.to_string())),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
