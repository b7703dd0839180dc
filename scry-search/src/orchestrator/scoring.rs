//! Position-decay ordering scores for merged engine results.
//!
//! Each engine returns results in its own relevance order. To merge two
//! engines' lists into one, every result gets an ordering score:
//!
//! ```text
//! score = engine_weight * (1.0 / (1.0 + position * 0.1))
//! ```
//!
//! These scores order the merged per-query list only; they carry no
//! meaning across queries and are not the relevance ranking used by the
//! pipeline's later stages.

use crate::types::SearchResult;

/// Calculate the ordering score for a result at `position` (0-based) in
/// its engine's list.
pub fn calculate_score(result: &SearchResult, position: usize) -> f64 {
    let engine_weight = parse_engine_weight(&result.engine);
    let position_decay = 1.0 / (1.0 + position as f64 * 0.1);
    engine_weight * position_decay
}

/// Apply ordering scores to a list of results from a single engine.
///
/// Returns the vector with the `score` field updated in place.
pub fn score_results(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    for (position, result) in results.iter_mut().enumerate() {
        result.score = calculate_score(result, position);
    }
    results
}

/// Engine weight from the engine name string, 1.0 for unknown engines.
fn parse_engine_weight(engine_name: &str) -> f64 {
    match engine_name {
        "SearXNG" => 1.2,
        "DuckDuckGo" => 1.0,
        _ => 1.0,
    }
}
