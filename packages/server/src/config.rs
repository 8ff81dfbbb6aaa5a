use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the scraper service; extraction answers 500 without it
    pub scraper_api_url: Option<String>,
    pub port: u16,
    pub max_concurrent_requests: usize,
    pub scraper_timeout: Duration,
    /// Resolve hostnames during SSRF validation
    pub ssrf_resolve_dns: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_concurrent_requests: usize =
            parse_or(get("MAX_CONCURRENT_REQUESTS"), 20, "MAX_CONCURRENT_REQUESTS")?;
        if max_concurrent_requests == 0 {
            bail!("MAX_CONCURRENT_REQUESTS must be at least 1");
        }

        Ok(Self {
            scraper_api_url: get("SCRAPER_API_URL"),
            port: parse_or(get("PORT"), 8080, "PORT")?,
            max_concurrent_requests,
            scraper_timeout: Duration::from_secs(parse_or(
                get("SCRAPER_TIMEOUT_SECS"),
                120,
                "SCRAPER_TIMEOUT_SECS",
            )?),
            ssrf_resolve_dns: match get("SSRF_RESOLVE_DNS") {
                Some(value) => parse_bool(&value).context("SSRF_RESOLVE_DNS must be a boolean")?,
                None => true,
            },
            rate_limit_per_second: parse_or(
                get("RATE_LIMIT_PER_SECOND"),
                10,
                "RATE_LIMIT_PER_SECOND",
            )?,
            rate_limit_burst: parse_or(get("RATE_LIMIT_BURST"), 20, "RATE_LIMIT_BURST")?,
        })
    }

    pub fn scraper_configured(&self) -> bool {
        self.scraper_api_url.is_some()
    }
}

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized boolean: {}", other),
    }
}
