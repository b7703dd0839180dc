//! SearXNG search engine — self-hosted metasearch with a JSON API.
//!
//! Queries a SearXNG instance at `{base}/search?q=…&format=json`. The
//! instance URL comes from configuration; instances behind HTTP Basic
//! auth are supported. SearXNG aggregates many upstream indexes, which
//! makes it the primary engine when an instance is available.

use crate::config::SearchConfig;
use crate::engine::SearchEngineTrait;
use crate::error::SearchError;
use crate::http;
use crate::types::{SearchEngine, SearchResult};
use serde::Deserialize;

/// SearXNG JSON API client.
pub struct SearxngEngine;

/// Top-level shape of a SearXNG `format=json` response. Fields we do
/// not consume are ignored.
#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngHit>,
}

/// A single hit in a SearXNG response.
#[derive(Debug, Deserialize)]
struct SearxngHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    /// SearXNG calls the snippet `content`.
    #[serde(default)]
    content: String,
}

impl SearchEngineTrait for SearxngEngine {
    async fn search(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "SearXNG search");

        let base = config.searxng_base_url.as_deref().ok_or_else(|| {
            SearchError::Config("searxng_base_url is required for the SearXNG engine".into())
        })?;

        let client = http::build_client(config.timeout_seconds, config.user_agent.as_deref())?;

        let endpoint = format!("{}/search", base.trim_end_matches('/'));
        let safesearch = if config.safe_search { "1" } else { "0" };
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("format", "json"),
            ("safesearch", safesearch),
        ];
        if let Some(ref lang) = config.language {
            params.push(("language", lang));
        }

        let mut request = client.get(&endpoint).query(&params);
        if let Some(ref user) = config.searxng_user {
            request = request.basic_auth(user, config.searxng_password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("SearXNG request failed: {e}")))?;

        http::check_status(response.status(), "SearXNG")?;

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("SearXNG response read failed: {e}")))?;

        tracing::trace!(bytes = body.len(), "SearXNG response received");

        parse_searxng_json(&body, config.max_results)
    }

    fn engine_type(&self) -> SearchEngine {
        SearchEngine::Searxng
    }
}

/// Parse a SearXNG JSON response body into search results.
///
/// Extracted as a separate function for testability with canned JSON.
/// Hits without a URL are skipped; the rest keep their API order.
pub(crate) fn parse_searxng_json(
    body: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    let decoded: SearxngResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("SearXNG JSON decode failed: {e}")))?;

    let mut results = Vec::new();
    for hit in decoded.results {
        if hit.url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: hit.title.trim().to_string(),
            url: hit.url,
            snippet: hit.content.trim().to_string(),
            engine: SearchEngine::Searxng.name().to_string(),
            score: 0.0,
        });
        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "SearXNG results parsed");
    Ok(results)
}
