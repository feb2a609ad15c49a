//! Client configuration. Values come from environment variables with defaults and
//! may be overridden by the binary's flags.

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to. Always ends with `/`.
    pub base_url: Url,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound on a geolocation request before the sentinel is used.
    pub geolocation_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: normalize_base(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid base url"),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            geolocation_timeout: Duration::from_millis(10_000),
            user_agent: format!("timeclock/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn parse_u64_env(name: &str) -> Option<u64> {
    match env::var(name) {
        Ok(val) => val.trim().parse::<u64>().ok(),
        Err(_) => None,
    }
}

/// Parse a base URL and make sure relative joins keep its path prefix.
pub fn normalize_base(raw: &str) -> ApiResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') { trimmed.to_string() } else { format!("{}/", trimmed) };
    let url = Url::parse(&with_slash).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(format!("{}: not a base url", raw)));
    }
    Ok(url)
}

impl ClientConfig {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Ok(Self { base_url: normalize_base(base_url)?, ..Default::default() })
    }

    /// Build from `TIMECLOCK_API_URL`, `TIMECLOCK_HTTP_TIMEOUT_SECS`,
    /// `TIMECLOCK_CONNECT_TIMEOUT_SECS` and `TIMECLOCK_GEO_TIMEOUT_MS`.
    pub fn from_env() -> ApiResult<Self> {
        let mut cfg = match env::var("TIMECLOCK_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(&url)?,
            _ => Self::default(),
        };
        if let Some(s) = parse_u64_env("TIMECLOCK_HTTP_TIMEOUT_SECS") { cfg.request_timeout = Duration::from_secs(s); }
        if let Some(s) = parse_u64_env("TIMECLOCK_CONNECT_TIMEOUT_SECS") { cfg.connect_timeout = Duration::from_secs(s); }
        if let Some(ms) = parse_u64_env("TIMECLOCK_GEO_TIMEOUT_MS") { cfg.geolocation_timeout = Duration::from_millis(ms); }
        Ok(cfg)
    }

    pub fn with_base_url(mut self, base_url: &str) -> ApiResult<Self> {
        self.base_url = normalize_base(base_url)?;
        Ok(self)
    }

    /// Resolve an endpoint path (leading slash optional) against the base URL.
    pub fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }
}
