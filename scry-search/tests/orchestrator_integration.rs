//! Integration tests for the search orchestrator pipeline.
//!
//! These tests exercise the full score → merge → dedup → sort → truncate
//! pipeline using synthetic results (no network calls). Live engine tests
//! are marked `#[ignore]` for manual/periodic validation.

use scry_search::orchestrator::dedup::dedup_first_wins;
use scry_search::orchestrator::scoring::score_results;
use scry_search::types::SearchResult;
use scry_search::{SearchConfig, SearchEngine};

fn make_result(url: &str, engine: &str, title: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: url.to_string(),
        snippet: format!("Snippet from {engine} for {title}"),
        engine: engine.to_string(),
        score: 0.0,
    }
}

/// Simulate the orchestrator pipeline without network calls: score each
/// engine's results by position, merge in submission order, drop
/// duplicate URLs first-wins, sort stably by score, truncate.
fn run_pipeline(
    engine_results: Vec<(SearchEngine, Vec<SearchResult>)>,
    max_results: usize,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::new();
    for (_engine, results) in engine_results {
        merged.extend(score_results(results));
    }

    let mut deduped = dedup_first_wins(merged);

    deduped.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    deduped.truncate(max_results);
    deduped
}

#[test]
fn full_pipeline_two_engines_dedup_first_wins() {
    let searxng_results = vec![
        make_result("https://shared.example.com", "SearXNG", "Shared"),
        make_result("https://searxng-only.example.com", "SearXNG", "SearXNG Only"),
    ];
    let ddg_results = vec![
        make_result("https://shared.example.com", "DuckDuckGo", "Shared DDG"),
        make_result("https://ddg-only.example.com", "DuckDuckGo", "DDG Only"),
    ];

    let results = run_pipeline(
        vec![
            (SearchEngine::Searxng, searxng_results),
            (SearchEngine::DuckDuckGo, ddg_results),
        ],
        10,
    );

    // Three unique URLs survive.
    assert_eq!(results.len(), 3);

    // The shared URL keeps the copy submitted first: SearXNG's, with
    // SearXNG's weighted position-0 score.
    let shared = results
        .iter()
        .find(|r| r.url == "https://shared.example.com")
        .expect("shared URL should survive dedup");
    assert_eq!(shared.engine, "SearXNG");
    assert_eq!(shared.title, "Shared");
    assert!((shared.score - 1.2).abs() < 1e-9);
}

#[test]
fn first_wins_even_when_later_copy_scores_higher() {
    // SearXNG lists the shared URL deep in its results (low score);
    // DuckDuckGo lists it first (higher score). The first-seen copy
    // still wins.
    let mut searxng_results: Vec<SearchResult> = (0..5)
        .map(|i| {
            make_result(
                &format!("https://filler{i}.example.com"),
                "SearXNG",
                &format!("Filler {i}"),
            )
        })
        .collect();
    searxng_results.push(make_result(
        "https://contested.example.com",
        "SearXNG",
        "Contested (deep)",
    ));
    let ddg_results = vec![make_result(
        "https://contested.example.com",
        "DuckDuckGo",
        "Contested (top)",
    )];

    let results = run_pipeline(
        vec![
            (SearchEngine::Searxng, searxng_results),
            (SearchEngine::DuckDuckGo, ddg_results),
        ],
        10,
    );

    let contested = results
        .iter()
        .find(|r| r.url == "https://contested.example.com")
        .expect("contested URL should survive");
    assert_eq!(contested.engine, "SearXNG");
    assert_eq!(contested.title, "Contested (deep)");
    // SearXNG position 5: 1.2 / (1 + 0.5) = 0.8, below DuckDuckGo's
    // discarded position-0 score of 1.0.
    assert!((contested.score - 0.8).abs() < 1e-9);
}

#[test]
fn equal_scores_preserve_merge_order() {
    // Two DuckDuckGo results at the same position in different engine
    // batches would tie; within one batch, positions differ, so build
    // the tie across engines with identical weights instead: two
    // distinct URLs from the same engine at the same position in two
    // separate batches.
    let batch_a = vec![make_result("https://a.example.com", "DuckDuckGo", "A")];
    let batch_b = vec![make_result("https://b.example.com", "DuckDuckGo", "B")];

    let results = run_pipeline(
        vec![
            (SearchEngine::DuckDuckGo, batch_a),
            (SearchEngine::DuckDuckGo, batch_b),
        ],
        10,
    );

    assert_eq!(results.len(), 2);
    assert!((results[0].score - results[1].score).abs() < 1e-9);
    // Stable sort keeps submission order for the tie.
    assert_eq!(results[0].url, "https://a.example.com");
    assert_eq!(results[1].url, "https://b.example.com");
}

#[test]
fn searxng_weight_ranks_above_duckduckgo_at_same_position() {
    let searxng_results = vec![make_result("https://sx.example.com", "SearXNG", "SX")];
    let ddg_results = vec![make_result("https://ddg.example.com", "DuckDuckGo", "DDG")];

    let results = run_pipeline(
        vec![
            (SearchEngine::DuckDuckGo, ddg_results),
            (SearchEngine::Searxng, searxng_results),
        ],
        10,
    );

    assert_eq!(results.len(), 2);
    // SearXNG carries weight 1.2 vs DuckDuckGo's 1.0, so it sorts first
    // even though it was submitted second.
    assert_eq!(results[0].url, "https://sx.example.com");
    assert_eq!(results[1].url, "https://ddg.example.com");
}

#[test]
fn score_ordering_within_one_engine() {
    let results: Vec<SearchResult> = (0..5)
        .map(|i| {
            make_result(
                &format!("https://page{i}.example.com"),
                "DuckDuckGo",
                &format!("Page {i}"),
            )
        })
        .collect();

    let final_results = run_pipeline(vec![(SearchEngine::DuckDuckGo, results)], 10);

    assert_eq!(final_results.len(), 5);
    for i in 1..final_results.len() {
        assert!(
            final_results[i - 1].score > final_results[i].score,
            "position decay should order results strictly at index {i}"
        );
    }
}

#[test]
fn max_results_truncation() {
    let results: Vec<SearchResult> = (0..20)
        .map(|i| {
            make_result(
                &format!("https://page{i}.example.com"),
                "SearXNG",
                &format!("Page {i}"),
            )
        })
        .collect();

    let final_results = run_pipeline(vec![(SearchEngine::Searxng, results)], 5);
    assert_eq!(final_results.len(), 5);
    assert!(final_results[0].score > final_results[4].score);
}

#[test]
fn tracking_parameters_do_not_defeat_dedup() {
    let searxng_results = vec![make_result(
        "https://example.com/article?utm_source=newsletter",
        "SearXNG",
        "Article",
    )];
    let ddg_results = vec![make_result(
        "https://example.com/article",
        "DuckDuckGo",
        "Article again",
    )];

    let results = run_pipeline(
        vec![
            (SearchEngine::Searxng, searxng_results),
            (SearchEngine::DuckDuckGo, ddg_results),
        ],
        10,
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].engine, "SearXNG");
}

#[test]
fn empty_engine_results_returns_empty() {
    let final_results = run_pipeline(vec![(SearchEngine::Searxng, vec![])], 10);
    assert!(final_results.is_empty());
}

#[test]
fn config_validation_rejects_invalid() {
    let config = SearchConfig {
        max_results: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = SearchConfig {
        engines: vec![],
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

// ── Live integration tests (require network) ──────────────────────────
// Run with: cargo test -p scry-search --test orchestrator_integration live_ -- --ignored

fn live_config(engines: Vec<SearchEngine>) -> SearchConfig {
    SearchConfig {
        engines,
        max_results: 10,
        timeout_seconds: 15,
        cache_ttl_seconds: 0,
        request_delay_ms: (200, 500),
        searxng_base_url: std::env::var("SCRY_SEARCH_BASE_URL").ok(),
        searxng_user: std::env::var("SCRY_SEARCH_USER").ok(),
        searxng_password: std::env::var("SCRY_SEARCH_PASSWORD").ok(),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore]
async fn live_duckduckgo_search_returns_results() {
    let config = live_config(vec![SearchEngine::DuckDuckGo]);

    match scry_search::search("rust programming language", &config).await {
        Ok(results) => {
            assert!(!results.is_empty(), "live search should return results");
            for r in &results {
                assert!(!r.title.is_empty(), "result title should not be empty");
                assert!(!r.url.is_empty(), "result URL should not be empty");
                assert!(r.score > 0.0, "result score should be positive");
            }
        }
        Err(e) => {
            // Network failures are acceptable in CI; just log
            eprintln!("Live search failed (acceptable in CI): {e}");
        }
    }
}

#[tokio::test]
#[ignore]
async fn live_searxng_search_returns_results() {
    if std::env::var("SCRY_SEARCH_BASE_URL").is_err() {
        eprintln!("SCRY_SEARCH_BASE_URL not set; skipping");
        return;
    }
    let config = live_config(vec![SearchEngine::Searxng]);

    match scry_search::search("rust programming language", &config).await {
        Ok(results) => {
            assert!(!results.is_empty(), "SearXNG should return results");
        }
        Err(e) => {
            eprintln!("SearXNG live search failed (acceptable): {e}");
        }
    }
}

/// Verify deduplication in practice: merged results carry unique URLs.
#[tokio::test]
#[ignore]
async fn live_search_dedup_unique_urls() {
    let mut engines = vec![SearchEngine::DuckDuckGo];
    if std::env::var("SCRY_SEARCH_BASE_URL").is_ok() {
        engines.push(SearchEngine::Searxng);
    }
    let config = SearchConfig {
        max_results: 20,
        ..live_config(engines)
    };

    match scry_search::search("rust programming language", &config).await {
        Ok(results) => {
            let urls: std::collections::HashSet<&str> =
                results.iter().map(|r| r.url.as_str()).collect();
            assert_eq!(
                urls.len(),
                results.len(),
                "results should have unique URLs after dedup"
            );
        }
        Err(e) => {
            eprintln!("Dedup live test failed (acceptable): {e}");
        }
    }
}

#[tokio::test]
#[ignore]
async fn live_search_respects_max_results() {
    let config = SearchConfig {
        max_results: 3,
        ..live_config(vec![SearchEngine::DuckDuckGo])
    };

    match scry_search::search("rust programming", &config).await {
        Ok(results) => {
            assert!(
                results.len() <= 3,
                "expected at most 3 results, got {}",
                results.len()
            );
        }
        Err(e) => {
            eprintln!("Max results live test failed (acceptable): {e}");
        }
    }
}

/// Live content extraction test — fetch a known stable URL directly.
#[tokio::test]
#[ignore]
async fn live_fetch_page_content_direct() {
    let config = scry_search::FetchConfig::default();
    match scry_search::fetch_page_content("https://www.rust-lang.org/", &config).await {
        Ok(content) => {
            assert!(!content.text.is_empty(), "extracted content should not be empty");
            assert!(content.word_count > 0, "word count should be positive");
            assert!(
                content.text.contains("Rust") || content.text.contains("rust"),
                "content should mention Rust"
            );
        }
        Err(e) => {
            eprintln!("Content extraction live test failed (acceptable): {e}");
        }
    }
}

/// Live reader-proxy fetch; needs SCRY_READER_BASE_URL.
#[tokio::test]
#[ignore]
async fn live_fetch_page_content_via_reader() {
    let Ok(reader_base) = std::env::var("SCRY_READER_BASE_URL") else {
        eprintln!("SCRY_READER_BASE_URL not set; skipping");
        return;
    };
    let config = scry_search::FetchConfig {
        reader_base_url: Some(reader_base),
        reader_api_key: std::env::var("SCRY_READER_API_KEY").ok(),
        ..Default::default()
    };

    match scry_search::fetch_page_content("https://www.rust-lang.org/", &config).await {
        Ok(content) => {
            assert!(!content.text.is_empty(), "reader body should not be empty");
        }
        Err(e) => {
            eprintln!("Reader live test failed (acceptable): {e}");
        }
    }
}

/// Memo integration: same query twice should return the same URLs.
#[tokio::test]
#[ignore]
async fn live_memoised_search_returns_same_results() {
    let config = SearchConfig {
        cache_ttl_seconds: 300,
        ..live_config(vec![SearchEngine::DuckDuckGo])
    };

    let first = scry_search::search("rust memoisation check", &config).await;
    let second = scry_search::search("rust memoisation check", &config).await;

    match (first, second) {
        (Ok(first_results), Ok(second_results)) => {
            let first_urls: Vec<&str> = first_results.iter().map(|r| r.url.as_str()).collect();
            let second_urls: Vec<&str> = second_results.iter().map(|r| r.url.as_str()).collect();
            assert_eq!(first_urls, second_urls, "memoised search should return same URLs");
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Memo live test failed (acceptable): {e}");
        }
    }
}
