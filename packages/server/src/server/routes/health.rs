use axum::{extract::Extension, Json};
use image_pipeline::QueueStatus;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    scraper_configured: bool,
    queue: QueueStatus,
}

/// Health check endpoint
///
/// Always 200 while the process is serving; a missing scraper URL is
/// reported, not treated as unhealthy.
pub async fn health_handler(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        scraper_configured: state.scraper_configured(),
        queue: state.scheduler.status(),
    })
}
