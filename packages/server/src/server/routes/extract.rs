//! Non-streaming extraction.
//!
//! POST /api/extract  `{ url, deepScrape? }`

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use image_pipeline::{dedupe_urls, ImageRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub url: Option<String>,
    /// Defaults to true
    pub deep_scrape: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub images: Vec<ImageRecord>,
    pub metadata: ExtractMetadata,
}

#[derive(Debug, Serialize)]
pub struct ExtractMetadata {
    pub total_found: usize,
    pub url: String,
    pub duplicates_removed: usize,
}

/// Reject a missing or blank URL before anything else runs.
pub(crate) fn require_url(url: Option<&str>) -> Result<&str, ApiError> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))
}

pub async fn extract_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let url = state
        .validate_url(require_url(request.url.as_deref())?)
        .await?;
    let extractor = state.extractor()?;
    let deep_scrape = request.deep_scrape.unwrap_or(true);

    let target = url.clone();
    let srcs = state
        .scheduler
        .submit(move || async move { extractor.extract(&target, deep_scrape).await })
        .await??;

    let deduped = dedupe_urls(&srcs);
    info!(
        url = %url,
        found = srcs.len(),
        kept = deduped.images.len(),
        removed = deduped.removed_count,
        "Extraction complete"
    );

    Ok(Json(ExtractResponse {
        success: true,
        metadata: ExtractMetadata {
            total_found: deduped.images.len(),
            url,
            duplicates_removed: deduped.removed_count,
        },
        images: deduped.images,
    }))
}
