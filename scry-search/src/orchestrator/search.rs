//! Core search orchestrator: concurrent engine fan-out, merge, dedup.
//!
//! Queries all configured engines concurrently, applies position-decay
//! ordering scores, merges the lists in engine-configuration order (a
//! deterministic order, independent of which engine answered first),
//! deduplicates by normalised URL keeping the first occurrence, sorts by
//! ordering score (stable, so ties keep merge order), and truncates to
//! the requested maximum.

use rand::Rng;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::engine::SearchEngineTrait;
use crate::engines::{DuckDuckGoEngine, SearxngEngine};
use crate::error::SearchError;
use crate::types::{SearchEngine, SearchResult};

use super::dedup::dedup_first_wins;
use super::scoring::score_results;

/// Orchestrate a concurrent search across all enabled engines.
///
/// # Pipeline
///
/// 1. Fan out to every engine in `config.engines` via
///    [`futures::future::join_all`], each with an optional random
///    pre-request delay from `config.request_delay_ms`
/// 2. Log per-engine errors at warn level; collect successful lists
/// 3. Apply position-decay ordering scores per engine
/// 4. Merge in engine-configuration order (join_all preserves it)
/// 5. Deduplicate by normalised URL, first occurrence wins
/// 6. Stable-sort by ordering score descending
/// 7. Truncate to `config.max_results`
///
/// # Errors
///
/// Returns [`SearchError::AllEnginesFailed`] only if **every** enabled
/// engine fails. Partial failures degrade to the surviving engines.
pub async fn orchestrate_search(
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<SearchResult>, SearchError> {
    let futures: Vec<_> = config
        .engines
        .iter()
        .map(|engine| {
            let q = query.to_string();
            let cfg = config.clone();
            let eng = *engine;
            let delay_ms = pick_delay_ms(config.request_delay_ms);
            async move {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                let result = query_engine(eng, &q, &cfg).await;
                (eng, result)
            }
        })
        .collect();

    let outcomes = futures::future::join_all(futures).await;

    let mut merged: Vec<SearchResult> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (engine, outcome) in outcomes {
        match outcome {
            Ok(engine_results) => {
                let count = engine_results.len();
                tracing::debug!(%engine, count, "engine returned results");
                merged.extend(score_results(engine_results));
            }
            Err(err) => {
                tracing::warn!(engine = %engine, error = %err, "engine query failed");
                errors.push(format!("{engine}: {err}"));
            }
        }
    }

    if merged.is_empty() && !errors.is_empty() {
        return Err(SearchError::AllEnginesFailed(errors.join("; ")));
    }

    let mut unique = dedup_first_wins(merged);

    // Stable sort: equal scores keep merge (engine-priority) order.
    unique.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    unique.truncate(config.max_results);

    Ok(unique)
}

/// Pick a random pre-request delay within the configured range.
fn pick_delay_ms(range: (u64, u64)) -> u64 {
    let (min, max) = range;
    if max == 0 || min > max {
        return 0;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// Query a single engine, dispatching to the concrete implementation.
async fn query_engine(
    engine: SearchEngine,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<SearchResult>, SearchError> {
    match engine {
        SearchEngine::Searxng => SearxngEngine.search(query, config).await,
        SearchEngine::DuckDuckGo => DuckDuckGoEngine.search(query, config).await,
    }
}
