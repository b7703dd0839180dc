//! Error types for the scry-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Credentials never appear in error messages.

/// Errors that can occur during web search and page retrieval.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// All enabled search engines failed to return results.
    #[error("all search engines failed: {0}")]
    AllEnginesFailed(String),

    /// A search or fetch operation timed out.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request failed at the transport level or with an
    /// unexpected status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider rejected our credentials (401/403).
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The provider asked us to slow down (429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Failed to parse a provider response (HTML or JSON).
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Whether retrying the same request later could succeed.
    ///
    /// Auth, parse, and config failures are deterministic; everything
    /// else is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Http(_) | Self::RateLimited(_) | Self::AllEnginesFailed(_)
        )
    }
}

/// Convenience type alias for scry-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
