use async_trait::async_trait;
use futures::StreamExt;
use image_pipeline::{ByteStream, ExtractError, ExtractResult, ImageExtractor};
use scraper_client::{ScrapeResponse, ScraperClient, ScraperError};

/// Scraper service client implementation of ImageExtractor
#[derive(Debug, Clone)]
pub struct ScraperAdapter {
    client: ScraperClient,
}

impl ScraperAdapter {
    pub fn new(client: ScraperClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ScraperClient {
        &self.client
    }
}

#[async_trait]
impl ImageExtractor for ScraperAdapter {
    async fn extract(&self, url: &str, deep_scrape: bool) -> ExtractResult<Vec<String>> {
        self.client
            .scrape(url, deep_scrape)
            .await
            .and_then(ScrapeResponse::into_images)
            .map_err(to_extract_error)
    }

    async fn open_stream(&self, url: &str, deep_scrape: bool) -> ExtractResult<ByteStream> {
        let stream = self
            .client
            .scrape_stream(url, deep_scrape)
            .await
            .map_err(to_extract_error)?;

        Ok(stream
            .map(|chunk| chunk.map_err(to_extract_error))
            .boxed())
    }
}

/// Upstream statuses pass through; everything else is a transport failure.
fn to_extract_error(error: ScraperError) -> ExtractError {
    match error {
        ScraperError::Api { status, .. } => ExtractError::Upstream { status },
        ScraperError::Scrape(message) => ExtractError::Scrape(message),
        other => ExtractError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn api_errors_keep_status() {
        let err = to_extract_error(ScraperError::Api {
            status: 503,
            message: "overloaded".into(),
        });
        assert!(matches!(err, ExtractError::Upstream { status: 503 }));
        assert_eq!(err.to_string(), "API error: 503");
    }

    #[test]
    fn scrape_failures_keep_message() {
        let err = to_extract_error(ScraperError::Scrape("page blocked".into()));
        assert_eq!(err.to_string(), "page blocked");
    }

    #[test]
    fn transport_failures_keep_underlying_message() {
        let err = to_extract_error(ScraperError::Timeout(Duration::from_secs(120)));
        assert!(matches!(err, ExtractError::Transport(_)));
        assert_eq!(err.to_string(), "Request timed out after 120s");

        let err = to_extract_error(ScraperError::Network("connection refused".into()));
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}
