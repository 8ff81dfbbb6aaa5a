//! The remote image scraper, as seen by the pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::ExtractResult;

/// Raw SSE bytes from the scraper's streaming endpoint.
pub type ByteStream = BoxStream<'static, ExtractResult<Bytes>>;

/// Source of discovered image URLs for a page.
///
/// Implementations perform the outbound call only; validation, scheduling
/// and deduplication happen around them.
#[async_trait]
pub trait ImageExtractor: Send + Sync {
    /// Extract every image URL found on `url`.
    async fn extract(&self, url: &str, deep_scrape: bool) -> ExtractResult<Vec<String>>;

    /// Open the scraper's SSE progress stream for `url`.
    ///
    /// Resolves once the upstream response headers arrive; a non-2xx status
    /// is reported here rather than inside the stream.
    async fn open_stream(&self, url: &str, deep_scrape: bool) -> ExtractResult<ByteStream>;
}
