//! Multi-URL extraction.
//!
//! POST /api/extract/batch  `{ urls, deepScrape?, filter? }`

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use image_pipeline::{
    filter_images, run_batch, BatchTracker, BatchUrlState, FilterCriteria, ImageRecord,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    pub deep_scrape: Option<bool>,
    pub filter: Option<FilterCriteria>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// True when at least one URL completed
    pub success: bool,
    pub urls: Vec<BatchUrlState>,
    pub images: Vec<ImageRecord>,
    pub metadata: BatchMetadata,
}

#[derive(Debug, Serialize)]
pub struct BatchMetadata {
    /// Merged, deduplicated images before `filter`
    pub total_found: usize,
    pub duplicates_removed: usize,
}

pub async fn batch_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let urls: Vec<String> = request
        .urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect();
    if urls.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one URL is required".to_string(),
        ));
    }
    let extractor = state.extractor()?;

    // Blocked URLs fail here and never reach the scheduler
    let mut states = Vec::with_capacity(urls.len());
    for url in urls {
        let mut url_state = BatchUrlState::pending(url.as_str());
        if let Err(e) = state.validate_url(&url).await {
            warn!(url = %url, error = %e, "Batch URL rejected");
            url_state.mark_failed(e.to_string());
        }
        states.push(url_state);
    }

    let tracker = BatchTracker::from_states(states);
    let outcome = run_batch(
        &state.scheduler,
        extractor,
        &tracker,
        request.deep_scrape.unwrap_or(true),
    )
    .await;

    let total_found = outcome.images.len();
    let success = outcome.completed_count() > 0;
    let failed = outcome.failed_count();
    let images = match &request.filter {
        Some(criteria) => filter_images(&outcome.images, criteria),
        None => outcome.images,
    };
    info!(
        urls = outcome.urls.len(),
        failed,
        total_found,
        shown = images.len(),
        "Batch request complete"
    );

    Ok(Json(BatchResponse {
        success,
        metadata: BatchMetadata {
            total_found,
            duplicates_removed: outcome.removed_count,
        },
        urls: outcome.urls,
        images,
    }))
}
