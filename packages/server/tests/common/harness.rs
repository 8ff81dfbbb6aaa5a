//! Test harness for driving the router in-process.
//!
//! No network: the scraper is a `MockExtractor` and requests go through
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use image_pipeline::testing::MockExtractor;
use image_pipeline::{ImageExtractor, RequestScheduler};
use serde_json::Value;
use server_core::server::{build_router, AppState};
use tower::ServiceExt;

/// Initialize tracing once; respects RUST_LOG.
/// Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Router plus the handles tests assert against.
pub struct TestApp {
    pub router: Router,
    pub scheduler: RequestScheduler,
    pub mock: MockExtractor,
}

impl TestApp {
    /// App backed by `mock`, scheduler capped at `max_concurrent`.
    pub fn with_mock(mock: MockExtractor, max_concurrent: usize) -> Self {
        init_tracing();
        let scheduler = RequestScheduler::new(max_concurrent);
        let extractor: Arc<dyn ImageExtractor> = Arc::new(mock.clone());
        let router = build_router(AppState::new(scheduler.clone(), Some(extractor)));
        Self {
            router,
            scheduler,
            mock,
        }
    }

    pub fn new(mock: MockExtractor) -> Self {
        Self::with_mock(mock, 4)
    }

    /// App with no scraper configured.
    pub fn unconfigured() -> Self {
        init_tracing();
        let scheduler = RequestScheduler::new(4);
        let router = build_router(AppState::new(scheduler.clone(), None));
        Self {
            router,
            scheduler,
            mock: MockExtractor::new(),
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// GET and read the whole body; only for responses that end.
    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, String) {
        let response = self.get_response(uri).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    pub async fn get_response(&self, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Percent-encode a URL for use as a query value.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Payloads of every `data:` record in an SSE body.
pub fn sse_payloads(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|record| record.lines().find_map(|l| l.strip_prefix("data: ")))
        .filter_map(|payload| serde_json::from_str(payload).ok())
        .collect()
}
