//! Trait definition for pluggable search engine backends.
//!
//! Each search engine (SearXNG, DuckDuckGo) implements
//! [`SearchEngineTrait`] to provide a uniform interface for querying and
//! parsing results.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{SearchEngine, SearchResult};

/// A pluggable search engine backend.
///
/// Implementors query a specific provider and extract structured
/// [`SearchResult`] values. Each engine handles its own:
///
/// - request construction with query encoding
/// - HTTP request with appropriate headers and auth
/// - response parsing (JSON API or CSS selectors over HTML)
/// - error classification: auth rejection, rate limiting, parse failure
///
/// All implementations must be `Send + Sync` for concurrent engine queries.
pub trait SearchEngineTrait: Send + Sync {
    /// Perform a web search and return parsed results.
    ///
    /// # Arguments
    ///
    /// * `query` — The search query string; the implementation handles
    ///   encoding.
    /// * `config` — Search configuration controlling timeouts, safe search,
    ///   language, and instance URLs.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the HTTP request fails, the response
    /// cannot be parsed, or the engine rejects/throttles the request.
    fn search(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;

    /// Returns which [`SearchEngine`] variant this implementation represents.
    fn engine_type(&self) -> SearchEngine;

    /// Returns the default weight for ordering results from this engine.
    ///
    /// Typically delegates to [`SearchEngine::weight()`].
    fn weight(&self) -> f64 {
        self.engine_type().weight()
    }
}
