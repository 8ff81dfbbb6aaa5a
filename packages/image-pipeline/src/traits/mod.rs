//! Trait seams for the outbound scraping dependency.

pub mod extractor;

pub use extractor::{ByteStream, ImageExtractor};
