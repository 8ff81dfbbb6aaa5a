//! User-chosen predicates over a result set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::ImageRecord;

/// Active filter predicates.
///
/// Each predicate is inactive when its field is empty, zero or absent; a
/// record is kept only if every active predicate passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Upper-case extensions, e.g. `"PNG"`
    pub formats: HashSet<String>,
    pub min_width: u32,
    pub source_urls: Option<HashSet<String>>,
    pub search_query: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given formats (compared case-insensitively).
    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.formats = formats
            .into_iter()
            .map(|f| f.as_ref().to_uppercase())
            .collect();
        self
    }

    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn with_source_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_urls = Some(urls.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    /// True when no predicate is active.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
            && self.min_width == 0
            && self.source_urls.as_ref().map_or(true, HashSet::is_empty)
            && self.search_needle().is_none()
    }

    /// Whether a single record passes every active predicate.
    pub fn matches(&self, image: &ImageRecord) -> bool {
        self.matches_format(image)
            && self.matches_width(image)
            && self.matches_source(image)
            && self.matches_search(image)
    }

    fn matches_format(&self, image: &ImageRecord) -> bool {
        if self.formats.is_empty() {
            return true;
        }
        let ext = image.extension();
        self.formats.iter().any(|f| f.eq_ignore_ascii_case(&ext))
    }

    fn matches_width(&self, image: &ImageRecord) -> bool {
        if self.min_width == 0 {
            return true;
        }
        // Indeterminate width passes
        match image.width() {
            Some(width) => width >= self.min_width,
            None => true,
        }
    }

    fn matches_source(&self, image: &ImageRecord) -> bool {
        match &self.source_urls {
            Some(urls) if !urls.is_empty() => image
                .source_url
                .as_ref()
                .is_some_and(|source| urls.contains(source)),
            _ => true,
        }
    }

    fn matches_search(&self, image: &ImageRecord) -> bool {
        match self.search_needle() {
            Some(needle) => image.name.to_lowercase().contains(&needle),
            None => true,
        }
    }

    fn search_needle(&self) -> Option<String> {
        self.search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Keep the records that pass every active predicate, in order.
pub fn filter_images(images: &[ImageRecord], criteria: &FilterCriteria) -> Vec<ImageRecord> {
    if criteria.is_empty() {
        return images.to_vec();
    }
    images
        .iter()
        .filter(|image| criteria.matches(image))
        .cloned()
        .collect()
}
