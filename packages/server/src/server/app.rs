//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use image_pipeline::{ImageExtractor, RequestScheduler, UrlValidator};
use scraper_client::ScraperClient;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::Config;
use crate::kernel::ScraperAdapter;
use crate::server::error::ApiError;
use crate::server::routes::{
    batch_handler, extract_handler, extract_stream_handler, health_handler,
    queue_status_handler, queue_stream_handler,
};

/// Shared application state
///
/// The scheduler is the single admission gate for every outbound scraper
/// call in the process; clones share it.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: RequestScheduler,
    /// `None` when no scraper URL is configured
    pub extractor: Option<Arc<dyn ImageExtractor>>,
    pub validator: Arc<UrlValidator>,
    pub resolve_dns: bool,
}

impl AppState {
    pub fn new(scheduler: RequestScheduler, extractor: Option<Arc<dyn ImageExtractor>>) -> Self {
        Self {
            scheduler,
            extractor,
            validator: Arc::new(UrlValidator::new()),
            resolve_dns: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let extractor = config.scraper_api_url.as_ref().map(|base_url| {
            let client = ScraperClient::new(base_url.as_str()).with_timeout(config.scraper_timeout);
            Arc::new(ScraperAdapter::new(client)) as Arc<dyn ImageExtractor>
        });

        Self::new(
            RequestScheduler::new(config.max_concurrent_requests),
            extractor,
        )
        .with_dns_resolution(config.ssrf_resolve_dns)
    }

    pub fn with_dns_resolution(mut self, resolve_dns: bool) -> Self {
        self.resolve_dns = resolve_dns;
        self
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn scraper_configured(&self) -> bool {
        self.extractor.is_some()
    }

    /// The configured extractor, or the 500 for a missing scraper URL.
    pub fn extractor(&self) -> Result<Arc<dyn ImageExtractor>, ApiError> {
        self.extractor.clone().ok_or(ApiError::NotConfigured)
    }

    /// SSRF check; returns the trimmed URL to forward.
    pub async fn validate_url(&self, url: &str) -> Result<String, ApiError> {
        let url = url.trim();
        if self.resolve_dns {
            self.validator.validate_with_dns(url).await?;
        } else {
            self.validator.validate(url)?;
        }
        debug!(url, "URL passed validation");
        Ok(url.to_string())
    }
}

/// Rate-limited API routes.
fn api_routes() -> Router {
    Router::new()
        .route("/api/extract", post(extract_handler))
        .route("/api/extract/stream", get(extract_stream_handler))
        .route("/api/extract/batch", post(batch_handler))
        .route("/api/queue", get(queue_status_handler))
        .route("/api/queue/stream", get(queue_stream_handler))
}

/// Routes and state without the outer middleware stack.
///
/// Used by tests, which drive the router directly with no peer address.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(api_routes())
        .layer(Extension(state))
}

/// Build the Axum application router
pub fn build_app(config: &Config) -> Result<Router> {
    let state = AppState::from_config(config);

    // CORS configuration - allow any origin; the site and API are separate hosts
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    // Per client IP, keyed on X-Forwarded-For when present
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .use_headers()
            .finish()
            .context("Invalid rate limit configuration")?,
    );

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    let app = Router::new()
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        .merge(api_routes().layer(rate_limit_layer))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}
