//! HTTP error mapping.
//!
//! Every failure path answers `{ "success": false, "error": <message> }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use image_pipeline::{ExtractError, SchedulerError, SecurityError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Fallback when a transport failure carries no message.
pub const GENERIC_FAILURE: &str = "Failed to extract images";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing URL, blocked target, malformed body
    #[error("{0}")]
    BadRequest(String),

    #[error("Scraper service is not configured")]
    NotConfigured,

    /// Non-2xx from the scraper, status passed through
    #[error("API error: {status}")]
    Upstream { status: u16 },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl From<SecurityError> for ApiError {
    fn from(e: SecurityError) -> Self {
        ApiError::BadRequest(format!("Invalid URL: {}", e))
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Upstream { status } => ApiError::Upstream { status },
            ExtractError::Transport(message) | ExtractError::Scrape(message) => {
                if message.trim().is_empty() {
                    ApiError::Internal(GENERIC_FAILURE.to_string())
                } else {
                    ApiError::Internal(message)
                }
            }
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        } else {
            warn!(status = %status, error = %self, "Request rejected");
        }

        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_passes_through() {
        let err = ApiError::from(ExtractError::Upstream { status: 429 });
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "API error: 429");
    }

    #[test]
    fn empty_transport_message_gets_fallback() {
        let err = ApiError::from(ExtractError::Transport(String::new()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), GENERIC_FAILURE);
    }

    #[test]
    fn security_errors_are_bad_requests() {
        let err = ApiError::from(SecurityError::BlockedHost("localhost".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid URL: blocked host: localhost");
    }

    #[test]
    fn not_configured_is_500() {
        assert_eq!(
            ApiError::NotConfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
