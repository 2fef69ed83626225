use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Site already exists: {0}")]
    SiteAlreadyExists(String),

    #[error("Site is not connected: {0}")]
    SiteNotConnected(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Callback is missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("No site matches callback url {0}")]
    NoMatchingSite(String),

    #[error("Authorization was rejected on {0}")]
    HandshakeRejected(String),

    #[error("Remote request failed ({status}): {message}")]
    RemoteFailed { status: u16, message: String },

    #[error("No response from remote site; the outcome could not be confirmed")]
    NoResponse,

    #[error("Another change is already in progress for {0}")]
    Busy(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Secret sealing error: {0}")]
    Sealing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            AppError::SiteNotFound(id) => (StatusCode::NOT_FOUND, format!("Site '{}' not found", id)),
            AppError::SiteAlreadyExists(url) => (
                StatusCode::CONFLICT,
                format!("A site with url '{}' already exists", url),
            ),
            AppError::SiteNotConnected(id) => (
                StatusCode::CONFLICT,
                format!("Site '{}' is not connected", id),
            ),
            AppError::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message),
            err @ AppError::MissingParameters(_) => (StatusCode::BAD_REQUEST, err.to_string()),
            err @ AppError::NoMatchingSite(_) => (StatusCode::NOT_FOUND, err.to_string()),
            err @ AppError::HandshakeRejected(_) => (StatusCode::FORBIDDEN, err.to_string()),
            AppError::RemoteFailed { status, message } => {
                tracing::warn!(status, "Remote request failed: {}", message);
                (StatusCode::BAD_GATEWAY, message)
            }
            AppError::NoResponse => (
                StatusCode::GATEWAY_TIMEOUT,
                "Could not confirm the result; the remote site did not respond in time".to_string(),
            ),
            AppError::Busy(resource) => {
                tracing::debug!("Rejected concurrent change for {}", resource);
                (
                    StatusCode::CONFLICT,
                    format!("A change for '{}' is already in progress", resource),
                )
            }
            AppError::MalformedResponse(raw) => {
                tracing::warn!("Malformed response from execution backend: {}", raw);
                (StatusCode::BAD_GATEWAY, format!("Malformed response: {}", raw))
            }
            AppError::Sealing(e) => {
                tracing::error!("Secret sealing error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store credentials".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
