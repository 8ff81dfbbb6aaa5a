//! Error types for the scraper client.

use std::time::Duration;

use thiserror::Error;

/// Result type for scraper client operations.
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Scraper client errors.
#[derive(Debug, Error)]
pub enum ScraperError {
    /// Configuration error (missing or malformed base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection refused, reset, DNS failure)
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not finish within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response from the scraper
    #[error("API error: {status}")]
    Api { status: u16, message: String },

    /// The scraper reported a failed extraction
    #[error("{0}")]
    Scrape(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}
