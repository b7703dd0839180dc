//! Error types for the scry pipeline.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via
//! [`ScryError::code()`]. Codes are part of the public API contract and
//! will not change.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
/// Use these for distinguishing errors rather than parsing Display output.
pub mod error_codes {
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication failed (invalid/missing credentials, 401/403).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// Request to a provider failed at the transport level.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// Provider asked us to slow down (429).
    pub const RATE_LIMITED: &str = "RATE_LIMITED";

    /// Request or operation timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// Model output or provider response could not be parsed.
    pub const PARSE_FAILED: &str = "PARSE_FAILED";

    /// Web search layer failure.
    pub const SEARCH_FAILED: &str = "SEARCH_FAILED";

    /// Disk cache read/write failure.
    pub const CACHE_ERROR: &str = "CACHE_ERROR";

    /// Pipeline coordination failure (stage panic, cancellation).
    pub const PIPELINE_ERROR: &str = "PIPELINE_ERROR";
}

/// Top-level error type for the research pipeline.
///
/// Each variant includes a stable error code accessible via
/// [`ScryError::code()`]. The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum ScryError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// Authentication failed (invalid/missing credentials, 401/403).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    Auth(String),

    /// Request to a provider failed at the transport level.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    Request(String),

    /// Provider asked us to slow down (429).
    #[error("[{}] {}", error_codes::RATE_LIMITED, .0)]
    RateLimited(String),

    /// Request or operation timed out.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    Timeout(String),

    /// Model output or provider response could not be parsed.
    #[error("[{}] {}", error_codes::PARSE_FAILED, .0)]
    Parse(String),

    /// Web search layer failure.
    #[error("[{}] {}", error_codes::SEARCH_FAILED, .0)]
    Search(String),

    /// Disk cache read/write failure.
    #[error("[{}] {}", error_codes::CACHE_ERROR, .0)]
    Cache(String),

    /// Pipeline coordination failure (stage panic, cancellation).
    #[error("[{}] {}", error_codes::PIPELINE_ERROR, .0)]
    Pipeline(String),
}

impl ScryError {
    /// Returns the stable error code for this error.
    ///
    /// Codes are SCREAMING_SNAKE_CASE strings that remain stable across
    /// releases. Use these for programmatic error handling rather than
    /// parsing Display output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Auth(_) => error_codes::AUTH_FAILED,
            Self::Request(_) => error_codes::REQUEST_FAILED,
            Self::RateLimited(_) => error_codes::RATE_LIMITED,
            Self::Timeout(_) => error_codes::TIMEOUT_ERROR,
            Self::Parse(_) => error_codes::PARSE_FAILED,
            Self::Search(_) => error_codes::SEARCH_FAILED,
            Self::Cache(_) => error_codes::CACHE_ERROR,
            Self::Pipeline(_) => error_codes::PIPELINE_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Auth(m)
            | Self::Request(m)
            | Self::RateLimited(m)
            | Self::Timeout(m)
            | Self::Parse(m)
            | Self::Search(m)
            | Self::Cache(m)
            | Self::Pipeline(m) => m,
        }
    }

    /// Returns true if this error represents a transient failure that can
    /// be retried.
    ///
    /// Retryable: transport failures, rate limits, timeouts, search-layer
    /// failures. Not retryable: configuration, authentication, parse,
    /// cache, and pipeline errors — retrying those repeats the same
    /// outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Auth(_) => false,
            Self::Parse(_) | Self::Cache(_) | Self::Pipeline(_) => false,
            Self::Request(_) | Self::RateLimited(_) | Self::Timeout(_) | Self::Search(_) => true,
        }
    }

    /// Returns true if this error must abort the whole run rather than
    /// degrade a single item. Every subsequent call to a provider that
    /// rejected our credentials will fail identically, so pressing on is
    /// pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Config(_))
    }
}

impl From<scry_search::SearchError> for ScryError {
    fn from(err: scry_search::SearchError) -> Self {
        use scry_search::SearchError;
        match err {
            SearchError::Auth(m) => Self::Auth(m),
            SearchError::RateLimited(m) => Self::RateLimited(m),
            SearchError::Timeout(m) => Self::Timeout(m),
            SearchError::Parse(m) => Self::Parse(m),
            SearchError::Config(m) => Self::Config(m),
            SearchError::Http(m) => Self::Request(m),
            SearchError::AllEnginesFailed(m) => Self::Search(m),
        }
    }
}

/// Convenience alias for scry results.
pub type Result<T> = std::result::Result<T, ScryError>;
