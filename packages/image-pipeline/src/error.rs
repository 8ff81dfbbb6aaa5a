//! Typed errors for the image pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the HTTP layer
//! can map each failure class onto its own status code.

use thiserror::Error;

/// Errors raised while talking to the remote scraping service.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The scraper answered with a non-2xx status
    #[error("API error: {status}")]
    Upstream { status: u16 },

    /// Connection failed, timed out, or the body could not be read
    #[error("{0}")]
    Transport(String),

    /// The scraper answered 2xx but reported a failed extraction
    #[error("{0}")]
    Scrape(String),
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, metadata services)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// URL parsing failed
    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors surfaced by the request scheduler itself.
///
/// The scheduler never wraps the operation's own error; this only covers
/// the case where the operation never produced a value at all.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The operation panicked or its task was torn down before settling
    #[error("scheduled operation {id} was abandoned before completing")]
    Abandoned { id: uuid::Uuid },
}

/// Result type alias for extraction calls.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
