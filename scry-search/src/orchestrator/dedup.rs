//! Result deduplication by normalised URL, first occurrence wins.
//!
//! Two results share an identity when their URLs normalise to the same
//! string (see [`super::url_normalize`]). The first occurrence in input
//! order is kept and later ones are dropped, so the output order is the
//! input order — a requirement for reproducible downstream ranking.
//! Same identity with a different title is still a duplicate: identity
//! is decided by the URL alone. Detecting near-duplicate *content*
//! behind distinct URLs is a known limitation, deliberately not
//! attempted here.

use std::collections::HashSet;

use crate::types::SearchResult;

use super::url_normalize::normalize_url;

/// Deduplicate search results by normalised URL.
///
/// Keeps the **first** result per identity in input order and preserves
/// that order in the output. Callers that want a particular survivor
/// (e.g. the highest-ordering-score one) must sort before deduplicating.
pub fn dedup_first_wins(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::with_capacity(results.len());
    let mut unique = Vec::with_capacity(results.len());

    for result in results {
        let identity = normalize_url(&result.url);
        if seen.insert(identity) {
            unique.push(result);
        } else {
            tracing::trace!(url = %result.url, "dropped duplicate result");
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(url: &str, engine: &str, score: f64) -> SearchResult {
        SearchResult {
            title: format!("Title from {engine}"),
            url: url.to_string(),
            snippet: format!("Snippet from {engine}"),
            engine: engine.to_string(),
            score,
        }
    }

    #[test]
    fn unique_urls_pass_through() {
        let results = vec![
            make_result("https://a.com", "SearXNG", 1.0),
            make_result("https://b.com", "DuckDuckGo", 0.8),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn duplicate_urls_keep_first() {
        let results = vec![
            make_result("https://example.com/page", "SearXNG", 1.2),
            make_result("https://example.com/page", "DuckDuckGo", 0.8),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].engine, "SearXNG");
    }

    #[test]
    fn first_wins_even_with_lower_score() {
        let results = vec![
            make_result("https://example.com", "DuckDuckGo", 0.5),
            make_result("https://example.com", "SearXNG", 1.5),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 1);
        assert!((deduped[0].score - 0.5).abs() < f64::EPSILON);
        assert_eq!(deduped[0].engine, "DuckDuckGo");
    }

    #[test]
    fn different_titles_same_url_still_duplicate() {
        let mut a = make_result("https://example.com/doc", "SearXNG", 1.0);
        a.title = "First title".into();
        let mut b = make_result("https://example.com/doc", "DuckDuckGo", 0.9);
        b.title = "A completely different title".into();

        let deduped = dedup_first_wins(vec![a, b]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].title, "First title");
    }

    #[test]
    fn output_preserves_input_order() {
        let results = vec![
            make_result("https://c.com", "SearXNG", 0.3),
            make_result("https://a.com", "SearXNG", 0.9),
            make_result("https://c.com", "DuckDuckGo", 0.8),
            make_result("https://b.com", "DuckDuckGo", 0.5),
        ];
        let deduped = dedup_first_wins(results);
        let urls: Vec<&str> = deduped.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://c.com", "https://a.com", "https://b.com"]);
    }

    #[test]
    fn normalisation_merges_equivalent_urls() {
        let results = vec![
            make_result("https://Example.COM/path/", "SearXNG", 1.0),
            make_result("https://example.com/path", "DuckDuckGo", 0.9),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].engine, "SearXNG");
    }

    #[test]
    fn tracking_params_ignored_for_dedup() {
        let results = vec![
            make_result("https://example.com/page?q=rust", "SearXNG", 1.0),
            make_result(
                "https://example.com/page?q=rust&utm_source=twitter",
                "DuckDuckGo",
                0.9,
            ),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn empty_input_returns_empty() {
        let deduped = dedup_first_wins(vec![]);
        assert!(deduped.is_empty());
    }

    #[test]
    fn single_result_passes_through() {
        let results = vec![make_result("https://solo.com", "DuckDuckGo", 1.0)];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn triple_duplicate_keeps_only_first() {
        let results = vec![
            make_result("https://example.com", "SearXNG", 1.0),
            make_result("https://example.com/", "DuckDuckGo", 0.9),
            make_result("https://EXAMPLE.com", "SearXNG", 0.8),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 1);
        assert!((deduped[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_urls_dedup_on_exact_match() {
        let results = vec![
            make_result("not a url", "SearXNG", 1.0),
            make_result("not a url", "DuckDuckGo", 0.9),
            make_result("also not a url", "SearXNG", 0.8),
        ];
        let deduped = dedup_first_wins(results);
        assert_eq!(deduped.len(), 2);
    }
}
