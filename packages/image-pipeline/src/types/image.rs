//! Image records as returned to callers.

use serde::{Deserialize, Serialize};

/// Placeholder used for dimensions and size when the scraper did not report them.
pub const UNKNOWN: &str = "Unknown";

/// Filename used when none can be derived from the image URL.
const DEFAULT_NAME: &str = "image.jpg";

/// One discovered image.
///
/// `id` is a display ordinal: it is dense, 1-based, and reassigned every
/// time a result set passes through [`crate::pipeline::dedupe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: usize,
    pub src: String,
    pub name: String,
    /// `"WxH"` or `"Unknown"`
    pub dimensions: String,
    /// Byte-size string or `"Unknown"`
    pub size: String,
    /// Page the image was found on (batch mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub default_checked: bool,
}

impl ImageRecord {
    /// Build a fresh record for a raw image URL.
    pub fn from_src(id: usize, src: impl Into<String>) -> Self {
        let src = src.into();
        let name = filename_from_src(&src);
        Self {
            id,
            src,
            name,
            dimensions: UNKNOWN.to_string(),
            size: UNKNOWN.to_string(),
            source_url: None,
            default_checked: false,
        }
    }

    /// Tag the record with the page it was discovered on.
    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    /// Set the reported dimensions (`"WxH"`).
    pub fn with_dimensions(mut self, dimensions: impl Into<String>) -> Self {
        self.dimensions = dimensions.into();
        self
    }

    /// Set the reported byte size.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Upper-cased text after the last `.` in `name`, or empty if there is none.
    pub fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_uppercase())
            .unwrap_or_default()
    }

    /// Leading integer of `dimensions`, if any.
    pub fn width(&self) -> Option<u32> {
        if self.dimensions == UNKNOWN {
            return None;
        }
        let trimmed = self.dimensions.trim_start();
        let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

/// Last path segment of `src`, falling back to `image.jpg`.
fn filename_from_src(src: &str) -> String {
    url::Url::parse(src)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}
