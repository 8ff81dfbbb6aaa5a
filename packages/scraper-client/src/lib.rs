//! Pure REST client for the remote image scraping service.
//!
//! Two calls: a blocking scrape that returns every image URL found on a
//! page, and a streaming scrape that hands back the raw SSE byte stream.
//! No domain logic lives here; deduplication and relaying happen in the
//! caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use scraper_client::ScraperClient;
//!
//! let client = ScraperClient::new("http://scraper.internal:8000");
//! let images = client.scrape("https://example.com/gallery", true).await?.into_images()?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, ScraperError};
pub use types::{ScrapeRequest, ScrapeResponse, ScrapeStatus, DEFAULT_FAILURE_MESSAGE};

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header, Client, Response};
use tracing::{debug, warn};

/// Default timeout for non-streaming scrapes, and for a stream's headers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// TCP connect timeout for every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the scraper service.
#[derive(Debug, Clone)]
pub struct ScraperClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl ScraperClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variable `SCRAPER_API_URL`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SCRAPER_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ScraperError::Config("SCRAPER_API_URL not set".into()))?;
        Ok(Self::new(base_url))
    }

    /// Timeout for [`scrape`](Self::scrape), and for the wait on
    /// [`scrape_stream`](Self::scrape_stream) headers. An open stream body
    /// is not bounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scrape a page and wait for the full image list.
    ///
    /// A 2xx answer is returned as-is, including `status: "error"`; use
    /// [`ScrapeResponse::into_images`] to turn that into an error.
    pub async fn scrape(&self, url: &str, deep_scrape: bool) -> Result<ScrapeResponse> {
        debug!(url, deep_scrape, "Requesting scrape");

        let response = self
            .http_client
            .post(format!("{}/scrape", self.base_url))
            .timeout(self.timeout)
            .json(&ScrapeRequest { url, deep_scrape })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = Self::check_status(response).await?;

        response.json::<ScrapeResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout(self.timeout)
            } else {
                ScraperError::Parse(format!("Failed to parse scrape response: {}", e))
            }
        })
    }

    /// Open the SSE progress stream for a page.
    ///
    /// Resolves once the response headers arrive, or fails with
    /// [`ScraperError::Timeout`] if they take longer than the client
    /// timeout. The returned stream yields
    /// raw bytes exactly as received; a transport failure mid-stream is its
    /// last item.
    pub async fn scrape_stream(
        &self,
        url: &str,
        deep_scrape: bool,
    ) -> Result<BoxStream<'static, Result<Bytes>>> {
        debug!(url, deep_scrape, "Opening scrape stream");

        let request = self
            .http_client
            .get(format!("{}/scrape/stream", self.base_url))
            .header(header::ACCEPT, "text/event-stream")
            .query(&[
                ("url", url),
                ("deep_scrape", if deep_scrape { "true" } else { "false" }),
            ])
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                warn!(timeout = ?self.timeout, "Scrape stream headers timed out");
                ScraperError::Timeout(self.timeout)
            })?
            .map_err(|e| self.transport_error(e))?;

        let response = Self::check_status(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ScraperError::Network(e.to_string())))
            .boxed())
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %message, "Scraper API error");
        Err(ScraperError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ScraperError {
        if e.is_timeout() {
            warn!(timeout = ?self.timeout, "Scrape request timed out");
            ScraperError::Timeout(self.timeout)
        } else {
            warn!(error = %e, "Scrape request failed");
            ScraperError::Network(e.to_string())
        }
    }
}
