//! Environment configuration.

use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the identity/role service, without a trailing slash.
    pub api_url: String,
    pub timeout: Duration,
    pub page_size: u32,
    pub search_debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset values take their default;
    /// unparsable ones do too, with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("LMSGATE_API_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self::default()
            .with_api_url(api_url)
            .with_timeout(Duration::from_secs(parse_or(
                &lookup,
                "LMSGATE_HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )))
            .with_page_size(parse_or(&lookup, "LMSGATE_PAGE_SIZE", DEFAULT_PAGE_SIZE))
            .with_search_debounce(Duration::from_millis(parse_or(
                &lookup,
                "LMSGATE_SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )))
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(var) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var, value = %raw, %default, "unparsable setting; using default");
            default
        }),
    }
}
