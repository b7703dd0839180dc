//! Concurrent search execution and cross-query deduplication.
//!
//! Every planned query runs under the search gate's pacing and a
//! bounded stage pool; completed result lists are merged back in
//! submission order so a run's candidate list is reproducible. A single
//! slow or failing query contributes nothing instead of stalling or
//! aborting the round.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use scry_search::SearchResult;
use scry_search::orchestrator::url_normalize::normalize_url;

use crate::config::ScryConfig;
use crate::error::{Result, ScryError};
use crate::gate::RequestGate;
use crate::planner::{SearchQuery, SubQuery};
use crate::rank::Rankable;

/// Headroom over the engines' own timeouts before a query is abandoned
/// outright.
const SEARCH_GRACE_SECONDS: u64 = 5;

/// Stored candidates keep a snippet preview, not the full provider
/// snippet.
const SNIPPET_PREVIEW_CHARS: usize = 500;

/// One deduplicated search hit, tagged with the sub-query whose search
/// query produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub result: SearchResult,
    /// Text of the sub-query this result serves; ranking uses it as
    /// directional context.
    pub sub_query: String,
}

impl Rankable for Candidate {
    fn representative_text(&self) -> &str {
        &self.result.snippet
    }

    fn source_identity(&self) -> &str {
        &self.result.url
    }

    fn direction_hint(&self) -> &str {
        &self.sub_query
    }
}

/// A query that contributed nothing, with the error that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub query: String,
    pub language: String,
    pub error: String,
}

/// What a search round produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Deduplicated candidates in submission order, first occurrence
    /// wins.
    pub candidates: Vec<Candidate>,
    /// Queries that yielded no results, with their errors.
    pub failures: Vec<QueryFailure>,
    /// Results dropped because an earlier query already produced the
    /// same identity.
    pub duplicates_dropped: usize,
}

/// Result lists for one query, in submission order.
struct QueryRound {
    results: Vec<SearchResult>,
    error: Option<ScryError>,
}

/// Run every search query and merge the deduplicated results.
///
/// # Errors
///
/// Only fatal errors (authentication, configuration) abort the round;
/// anything else degrades to a recorded per-query failure.
pub async fn execute(
    gate: &RequestGate,
    config: &ScryConfig,
    sub_queries: &[SubQuery],
    queries: &[SearchQuery],
) -> Result<ExecutionOutcome> {
    let concurrency = config.pipeline.search_concurrency.max(1);
    let rounds: Vec<QueryRound> = stream::iter(queries.iter().map(|query| async move {
        match run_query(gate, config, query).await {
            Ok(results) => Ok(QueryRound {
                results,
                error: None,
            }),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(
                    query = %query.text,
                    language = %query.language,
                    error = %err,
                    "search query failed"
                );
                Ok(QueryRound {
                    results: Vec::new(),
                    error: Some(err),
                })
            }
        }
    }))
    .buffered(concurrency)
    .try_collect()
    .await?;

    let outcome = merge_rounds(sub_queries, queries, rounds);
    info!(
        queries = queries.len(),
        candidates = outcome.candidates.len(),
        duplicates = outcome.duplicates_dropped,
        failed = outcome.failures.len(),
        "search round complete"
    );
    Ok(outcome)
}

async fn run_query(
    gate: &RequestGate,
    config: &ScryConfig,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>> {
    let _permit = gate.acquire().await;
    let search_config = config.search_config(Some(&query.language));
    let ceiling = Duration::from_secs(config.search.timeout_seconds + SEARCH_GRACE_SECONDS);
    let results = tokio::time::timeout(ceiling, scry_search::search(&query.text, &search_config))
        .await
        .map_err(|_| {
            ScryError::Timeout(format!(
                "search '{}' exceeded {}s",
                query.text,
                ceiling.as_secs()
            ))
        })??;
    debug!(query = %query.text, count = results.len(), "query returned");
    Ok(results)
}

/// Merge per-query rounds in submission order, dropping results whose
/// identity an earlier query already produced.
fn merge_rounds(
    sub_queries: &[SubQuery],
    queries: &[SearchQuery],
    rounds: Vec<QueryRound>,
) -> ExecutionOutcome {
    let mut outcome = ExecutionOutcome::default();
    let mut seen = HashSet::new();
    for (query, round) in queries.iter().zip(rounds) {
        if let Some(err) = round.error {
            outcome.failures.push(QueryFailure {
                query: query.text.clone(),
                language: query.language.clone(),
                error: err.to_string(),
            });
        }
        let direction = sub_queries
            .get(query.sub_query)
            .map_or("", |sub| sub.text.as_str());
        for mut result in round.results {
            if seen.insert(dedup_identity(&result)) {
                clamp_preview(&mut result.snippet);
                outcome.candidates.push(Candidate {
                    result,
                    sub_query: direction.to_owned(),
                });
            } else {
                outcome.duplicates_dropped += 1;
            }
        }
    }
    outcome
}

/// Identity under which a result deduplicates: the normalised URL, or a
/// hash of the normalised title and snippet when the URL does not parse
/// (engines occasionally emit relative or wrapper-mangled links).
///
/// The `text:` prefix keeps the two key spaces disjoint.
fn dedup_identity(result: &SearchResult) -> String {
    if Url::parse(&result.url).is_ok() {
        return normalize_url(&result.url);
    }
    let text = format!(
        "{}\n{}",
        result.title.trim().to_lowercase(),
        result.snippet.trim().to_lowercase()
    );
    format!("text:{}", blake3::hash(text.as_bytes()).to_hex())
}

/// Cut the snippet to the preview budget without splitting a UTF-8 code
/// point.
fn clamp_preview(snippet: &mut String) {
    if snippet.len() <= SNIPPET_PREVIEW_CHARS {
        return;
    }
    let mut end = SNIPPET_PREVIEW_CHARS;
    while end > 0 && !snippet.is_char_boundary(end) {
        end -= 1;
    }
    snippet.truncate(end);
}
