//! Wire types for the scraper service.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScraperError};

/// Fallback message when the scraper fails without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Extraction failed";

/// Body of `POST /scrape`.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRequest<'a> {
    pub url: &'a str,
    pub deep_scrape: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// Non-streaming scrape result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub status: ScrapeStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScrapeResponse {
    /// Image URLs of a successful scrape, or the scraper's own error.
    pub fn into_images(self) -> Result<Vec<String>> {
        match self.status {
            ScrapeStatus::Success => Ok(self.images),
            ScrapeStatus::Error | ScrapeStatus::Unknown => Err(ScraperError::Scrape(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_images_is_empty() {
        let response: ScrapeResponse = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(response.into_images().unwrap().is_empty());
    }

    #[test]
    fn error_status_carries_message() {
        let response: ScrapeResponse =
            serde_json::from_str(r#"{"status":"error","error":"page blocked"}"#).unwrap();
        let err = response.into_images().unwrap_err();
        assert_eq!(err.to_string(), "page blocked");
    }

    #[test]
    fn unknown_status_falls_back_to_generic_message() {
        let response: ScrapeResponse = serde_json::from_str(r#"{"status":"weird"}"#).unwrap();
        assert_eq!(response.status, ScrapeStatus::Unknown);
        assert_eq!(
            response.into_images().unwrap_err().to_string(),
            DEFAULT_FAILURE_MESSAGE
        );
    }

    #[test]
    fn request_uses_snake_case() {
        let json = serde_json::to_value(ScrapeRequest {
            url: "https://example.com",
            deep_scrape: true,
        })
        .unwrap();
        assert_eq!(json["deep_scrape"], true);
    }
}
