//! Scheduler observability.
//!
//! GET /api/queue         - JSON snapshot
//! GET /api/queue/stream  - SSE, one `queue` event per change
//!
//! Both are advisory: a snapshot can be stale by the time it is rendered.

use std::convert::Infallible;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use image_pipeline::QueueStatus;
use tokio_stream::StreamExt;

use crate::server::app::AppState;

pub async fn queue_status_handler(Extension(state): Extension<AppState>) -> Json<QueueStatus> {
    Json(state.scheduler.status())
}

/// Current status first, then every change until the client disconnects.
pub async fn queue_stream_handler(
    Extension(state): Extension<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let updates = state
        .scheduler
        .subscribe()
        .into_stream()
        .filter_map(|status| {
            Event::default()
                .event("queue")
                .json_data(status)
                .ok()
                .map(Ok)
        });

    Sse::new(updates).keep_alive(KeepAlive::default())
}
