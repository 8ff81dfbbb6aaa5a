//! Image Extraction Pipeline
//!
//! Everything between "a user wants the images on this page" and the list
//! they actually see, minus the scraping itself:
//!
//! - URLs are vetted against SSRF targets before any outbound call
//! - outbound calls run through a bounded FIFO scheduler
//! - results are deduplicated on a canonical key that ignores size variants
//! - streamed scraper progress is re-framed and patched on the fly
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use image_pipeline::{BatchTracker, RequestScheduler, UrlValidator, run_batch};
//! use image_pipeline::testing::MockExtractor;
//!
//! let validator = UrlValidator::new();
//! validator.validate("https://example.com/gallery")?;
//!
//! let scheduler = RequestScheduler::new(20);
//! let extractor = Arc::new(MockExtractor::new());
//! let tracker = BatchTracker::new(["https://example.com/gallery"]);
//! let outcome = run_batch(&scheduler, extractor, &tracker, false).await;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Image records and batch progress
//! - [`pipeline`] - Canonicalization, dedupe, filtering, batch merge
//! - [`scheduler`] - Bounded-concurrency FIFO request queue
//! - [`relay`] - SSE re-framing with completion-record dedupe
//! - [`security`] - SSRF protection
//! - [`traits`] - The scraper seam ([`ImageExtractor`])
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod relay;
pub mod scheduler;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{
    ExtractError, ExtractResult, SchedulerError, SecurityError, SecurityResult,
};
pub use pipeline::{
    canonicalize, dedupe_records, dedupe_urls, filter_images, run_batch, BatchOutcome,
    BatchTracker, Deduplicated, FilterCriteria,
};
pub use relay::{patch_complete_record, pump, PumpOutcome, SseRelay, Utf8Decoder};
pub use scheduler::{QueueStatus, QueueSubscription, RequestScheduler, MAX_CONCURRENT};
pub use security::UrlValidator;
pub use traits::{ByteStream, ImageExtractor};
pub use types::{BatchStatus, BatchUrlState, ImageRecord};
