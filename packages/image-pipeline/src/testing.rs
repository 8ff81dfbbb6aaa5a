//! Mock extractor for testing.
//!
//! Serves canned image lists, failures and SSE chunks per page URL and
//! records every call so tests can assert on what reached the scraper.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::error::{ExtractError, ExtractResult};
use crate::traits::{ByteStream, ImageExtractor};

/// Which extractor method was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCallKind {
    Extract,
    OpenStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub kind: MockCallKind,
    pub url: String,
    pub deep_scrape: bool,
}

/// Configurable [`ImageExtractor`].
///
/// Unknown URLs extract to an empty list and stream nothing. Clones share
/// configuration and call history.
///
/// # Example
///
/// ```rust
/// use image_pipeline::testing::MockExtractor;
///
/// let mock = MockExtractor::new()
///     .with_images("https://example.com", ["https://example.com/a.jpg"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockExtractor {
    images: Arc<RwLock<HashMap<String, Vec<String>>>>,
    failures: Arc<RwLock<HashMap<String, ExtractError>>>,
    streams: Arc<RwLock<HashMap<String, Vec<ExtractResult<Bytes>>>>>,
    calls: Arc<RwLock<Vec<MockCall>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    delay: Option<Duration>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image URLs returned by `extract` for `url`.
    pub fn with_images<I, S>(self, url: impl Into<String>, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images
            .write()
            .unwrap()
            .insert(url.into(), images.into_iter().map(Into::into).collect());
        self
    }

    /// Fail both `extract` and `open_stream` for `url`.
    pub fn with_failure(self, url: impl Into<String>, error: ExtractError) -> Self {
        self.failures.write().unwrap().insert(url.into(), error);
        self
    }

    /// Raw SSE chunks yielded by `open_stream` for `url`.
    pub fn with_stream<I, B>(self, url: impl Into<String>, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.streams.write().unwrap().insert(url.into(), chunks);
        self
    }

    /// Stream chunks that end in a transport error.
    pub fn with_broken_stream<I, B>(self, url: impl Into<String>, chunks: I, error: &str) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut items: Vec<ExtractResult<Bytes>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        items.push(Err(ExtractError::Transport(error.to_string())));
        self.streams.write().unwrap().insert(url.into(), items);
        self
    }

    /// Sleep before answering `extract`, to hold scheduler slots.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Per-URL delay; overrides [`with_delay`](Self::with_delay) for `url`.
    pub fn with_delay_for(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(url.into(), delay);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    fn record(&self, kind: MockCallKind, url: &str, deep_scrape: bool) {
        self.calls.write().unwrap().push(MockCall {
            kind,
            url: url.to_string(),
            deep_scrape,
        });
    }

    fn failure_for(&self, url: &str) -> Option<ExtractError> {
        self.failures.read().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl ImageExtractor for MockExtractor {
    async fn extract(&self, url: &str, deep_scrape: bool) -> ExtractResult<Vec<String>> {
        self.record(MockCallKind::Extract, url, deep_scrape);

        let delay = self.delays.read().unwrap().get(url).copied().or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failure_for(url) {
            return Err(error);
        }
        Ok(self
            .images
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_stream(&self, url: &str, deep_scrape: bool) -> ExtractResult<ByteStream> {
        self.record(MockCallKind::OpenStream, url, deep_scrape);

        if let Some(error) = self.failure_for(url) {
            return Err(error);
        }
        let chunks = self
            .streams
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default();
        Ok(stream::iter(chunks).boxed())
    }
}
