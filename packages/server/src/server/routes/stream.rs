//! Streaming extraction.
//!
//! GET /api/extract/stream?url=..&deep_scrape=..
//!
//! Proxies the scraper's SSE progress feed through [`SseRelay`], which
//! re-frames records and dedupes the image list of the completion record.
//!
//! The whole relay runs as one scheduled operation, so a stream holds its
//! scheduler slot until it ends. The response body is the receiving half of
//! a bounded channel: when the client disconnects the channel closes, the
//! pump stops, the upstream connection is dropped and the slot is freed.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use image_pipeline::{pump, ExtractError, SseRelay};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, info};

use super::extract::require_url;
use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Records buffered between the relay and a slow client.
const RELAY_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub url: Option<String>,
    pub deep_scrape: Option<String>,
}

impl StreamQuery {
    /// Anything but the literal `false` means deep.
    pub fn deep_scrape(&self) -> bool {
        self.deep_scrape.as_deref() != Some("false")
    }
}

pub async fn extract_stream_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let url = state
        .validate_url(require_url(query.url.as_deref())?)
        .await?;
    let extractor = state.extractor()?;
    let deep_scrape = query.deep_scrape();

    let (opened_tx, opened_rx) = oneshot::channel::<Result<(), ExtractError>>();
    let (tx, rx) = mpsc::channel::<Bytes>(RELAY_BUFFER);

    let target = url.clone();
    // Admission is decided at submit; the caller future is not needed since
    // results flow back through `opened_rx` and `rx`.
    let _ = state.scheduler.submit(move || async move {
        if opened_tx.is_closed() {
            debug!(url = %target, "Client left while queued, skipping upstream");
            return;
        }

        let upstream = match extractor.open_stream(&target, deep_scrape).await {
            Ok(upstream) => upstream,
            Err(e) => {
                let _ = opened_tx.send(Err(e));
                return;
            }
        };
        if opened_tx.send(Ok(())).is_err() {
            return;
        }

        let outcome = pump(SseRelay::new(upstream), tx).await;
        info!(
            url = %target,
            records = outcome.records,
            downstream_closed = outcome.downstream_closed,
            "Stream relay finished"
        );
    });

    match opened_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ApiError::Internal(
                "Stream relay stopped before opening".to_string(),
            ))
        }
    }

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}
