// Image Extraction API - Server Core
//
// HTTP surface over the image pipeline: validates URLs, throttles outbound
// scraper calls through one shared scheduler, and relays streamed progress.
//
// kernel/ wires external services into pipeline traits; server/ holds the
// axum app and routes.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
