//! Core types for web search results and engine identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single search result returned from a web search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The title of the search result page.
    pub title: String,
    /// The URL of the search result.
    pub url: String,
    /// A text snippet summarising the page content.
    pub snippet: String,
    /// Which search engine returned this result.
    pub engine: String,
    /// Provider-side ordering score (higher is better). Computed from the
    /// result's position in the engine's list and the engine weight; used
    /// only to order the merged per-query list, not comparable across queries.
    pub score: f64,
}

/// Supported search engines that scry-search can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchEngine {
    /// SearXNG — self-hosted metasearch aggregator with a JSON API.
    Searxng,
    /// DuckDuckGo — HTML-only endpoint, no API key, tolerant of automation.
    DuckDuckGo,
}

impl SearchEngine {
    /// Returns the human-readable name of this engine.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Searxng => "SearXNG",
            Self::DuckDuckGo => "DuckDuckGo",
        }
    }

    /// Returns the default weight for this engine in result ordering.
    /// SearXNG aggregates several upstream indexes, so its results rank
    /// slightly above a single-engine scrape.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Searxng => 1.2,
            Self::DuckDuckGo => 1.0,
        }
    }

    /// Returns all available engine variants.
    pub fn all() -> &'static [SearchEngine] {
        &[Self::Searxng, Self::DuckDuckGo]
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracted readable content from a fetched web page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// The URL that was fetched.
    pub url: String,
    /// The page title extracted from HTML (empty if none was found).
    pub title: String,
    /// Cleaned, readable text content with HTML boilerplate stripped.
    pub text: String,
    /// Number of words in the extracted text.
    pub word_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_construction() {
        let result = SearchResult {
            title: "Example".into(),
            url: "https://example.com".into(),
            snippet: "An example page".into(),
            engine: "SearXNG".into(),
            score: 1.2,
        };
        assert_eq!(result.title, "Example");
        assert_eq!(result.engine, "SearXNG");
        assert!((result.score - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn search_result_serde_round_trip() {
        let result = SearchResult {
            title: "Test".into(),
            url: "https://test.com".into(),
            snippet: "snippet".into(),
            engine: "DuckDuckGo".into(),
            score: 0.9,
        };
        let json = serde_json::to_string(&result).expect("serialize");
        let decoded: SearchResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.title, "Test");
        assert_eq!(decoded.url, "https://test.com");
    }

    #[test]
    fn search_engine_display() {
        assert_eq!(SearchEngine::Searxng.to_string(), "SearXNG");
        assert_eq!(SearchEngine::DuckDuckGo.to_string(), "DuckDuckGo");
    }

    #[test]
    fn search_engine_weight() {
        assert!((SearchEngine::Searxng.weight() - 1.2).abs() < f64::EPSILON);
        assert!((SearchEngine::DuckDuckGo.weight() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn search_engine_all() {
        let all = SearchEngine::all();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&SearchEngine::Searxng));
        assert!(all.contains(&SearchEngine::DuckDuckGo));
    }

    #[test]
    fn search_engine_equality_and_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(SearchEngine::Searxng);
        set.insert(SearchEngine::Searxng);
        assert_eq!(set.len(), 1);
        set.insert(SearchEngine::DuckDuckGo);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn search_engine_serde_round_trip() {
        let engine = SearchEngine::Searxng;
        let json = serde_json::to_string(&engine).expect("serialize");
        let decoded: SearchEngine = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, SearchEngine::Searxng);
    }

    #[test]
    fn page_content_construction() {
        let page = PageContent {
            url: "https://example.com".into(),
            title: "Example".into(),
            text: "Hello world".into(),
            word_count: 2,
        };
        assert_eq!(page.word_count, 2);
        assert_eq!(page.title, "Example");
    }

    #[test]
    fn page_content_serde_round_trip() {
        let page = PageContent {
            url: "https://example.com".into(),
            title: "Example".into(),
            text: "content".into(),
            word_count: 1,
        };
        let json = serde_json::to_string(&page).expect("serialize");
        let decoded: PageContent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.url, "https://example.com");
    }
}
