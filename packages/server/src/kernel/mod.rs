//! Kernel module - adapters from external services to pipeline traits.

pub mod scraper_adapter;

pub use scraper_adapter::ScraperAdapter;

// Re-export the pipeline seam for easy access
pub use image_pipeline::{ByteStream, ImageExtractor};
