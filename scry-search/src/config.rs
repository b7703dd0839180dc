//! Search and fetch configuration with sensible defaults.
//!
//! [`SearchConfig`] controls which engines are queried, timeouts, caching,
//! and request behaviour. [`FetchConfig`] controls page retrieval. The
//! defaults are tuned for polite scraping against public endpoints; callers
//! targeting a self-hosted SearXNG instance set `searxng_base_url` (and
//! credentials when the instance sits behind HTTP Basic auth).

use crate::error::SearchError;
use crate::types::SearchEngine;

/// Configuration for a web search operation.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Which search engines to query. Queried concurrently; results are merged.
    pub engines: Vec<SearchEngine>,
    /// Maximum number of results to return after deduplication and ordering.
    pub max_results: usize,
    /// Per-engine HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to request safe search filtering from engines that support it.
    pub safe_search: bool,
    /// How long to memoise merged results in seconds. Set to 0 to disable.
    pub cache_ttl_seconds: u64,
    /// Random delay range in milliseconds `(min, max)` applied before each
    /// engine request, spreading concurrent engine hits over time.
    pub request_delay_ms: (u64, u64),
    /// Preferred result language (e.g. `"en"`, `"ru"`). Passed to engines
    /// that support a language hint; `None` leaves it to the engine.
    pub language: Option<String>,
    /// Base URL of the SearXNG instance (e.g. `http://localhost:8888`).
    /// Required when [`SearchEngine::Searxng`] is enabled.
    pub searxng_base_url: Option<String>,
    /// HTTP Basic auth username for the SearXNG instance.
    pub searxng_user: Option<String>,
    /// HTTP Basic auth password for the SearXNG instance.
    pub searxng_password: Option<String>,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engines: vec![SearchEngine::Searxng, SearchEngine::DuckDuckGo],
            max_results: 10,
            timeout_seconds: 10,
            safe_search: true,
            cache_ttl_seconds: 600,
            request_delay_ms: (0, 250),
            language: None,
            searxng_base_url: None,
            searxng_user: None,
            searxng_password: None,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_results` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    /// - `engines` must not be empty
    /// - `request_delay_ms.0` must be <= `request_delay_ms.1`
    /// - `searxng_base_url` must be set and parseable when SearXNG is enabled
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.engines.is_empty() {
            return Err(SearchError::Config(
                "at least one engine must be enabled".into(),
            ));
        }
        if self.request_delay_ms.0 > self.request_delay_ms.1 {
            return Err(SearchError::Config(
                "request_delay_ms min must be <= max".into(),
            ));
        }
        if self.engines.contains(&SearchEngine::Searxng) {
            match self.searxng_base_url {
                None => {
                    return Err(SearchError::Config(
                        "searxng_base_url is required when the SearXNG engine is enabled".into(),
                    ));
                }
                Some(ref base) => {
                    if url::Url::parse(base).is_err() {
                        return Err(SearchError::Config(format!(
                            "searxng_base_url is not a valid URL: {base}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Configuration for fetching and extracting a single web page.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum characters of extracted text to return.
    pub max_chars: usize,
    /// Optional reader-proxy base URL (e.g. a Jina-style
    /// `https://r.example.com`). When set, pages are fetched as
    /// `{base}/{percent-encoded target URL}` and the response body is
    /// treated as pre-extracted text. When unset, pages are fetched
    /// directly and HTML is extracted locally.
    pub reader_base_url: Option<String>,
    /// Bearer token for the reader proxy.
    pub reader_api_key: Option<String>,
    /// Custom User-Agent string; `None` rotates the built-in list.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            max_chars: crate::content::DEFAULT_MAX_CHARS,
            reader_base_url: None,
            reader_api_key: None,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_chars == 0 {
            return Err(SearchError::Config(
                "max_chars must be greater than 0".into(),
            ));
        }
        if let Some(ref base) = self.reader_base_url {
            if url::Url::parse(base).is_err() {
                return Err(SearchError::Config(format!(
                    "reader_base_url is not a valid URL: {base}"
                )));
            }
        }
        Ok(())
    }
}
