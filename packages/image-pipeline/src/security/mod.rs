//! SSRF protection for user-supplied page URLs.

pub mod validator;

pub use validator::UrlValidator;
