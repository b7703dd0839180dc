//! Sub-query and search-query planning.
//!
//! Breaks a research topic into focused sub-queries, then expands each
//! sub-query into per-language web search queries. Both steps prompt the
//! generation backend for marker-prefixed lines and keep only lines
//! carrying the marker; everything else the model says is discarded, so a
//! chatty model degrades to a shorter plan instead of a broken one.
//!
//! The planner holds no pipeline state: it does not touch the cache, and
//! callers persist its output.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gate::RequestGate;
use crate::llm::{GenerationBackend, GenerationRequest};

/// Marker the backend must put in front of every sub-query line.
pub const SUBQUERY_MARKER: &str = "SUBQUERY:";
/// Marker the backend must put in front of every search-query line.
pub const QUERY_MARKER: &str = "QUERY:";

/// One facet of the research topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
    pub text: String,
    /// Position in the plan; stable across a run and used in cache keys.
    pub index: usize,
}

/// One provider-ready search string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Language code the query was planned in, e.g. `en` or `ru`.
    pub language: String,
    /// Index of the parent [`SubQuery`].
    pub sub_query: usize,
}

/// Break `topic` into at most `max_sub_queries` sub-queries.
///
/// Malformed or empty backend output yields an empty list; the caller
/// decides how to degrade. Generation failures propagate so fatal ones
/// (bad credentials) can abort the run.
///
/// # Errors
///
/// Returns an error when the generation call itself fails.
pub async fn plan_sub_queries(
    backend: &dyn GenerationBackend,
    gate: &RequestGate,
    topic: &str,
    max_sub_queries: usize,
) -> Result<Vec<SubQuery>> {
    let request = GenerationRequest::new(sub_query_prompt(max_sub_queries), topic);
    let _permit = gate.acquire().await;
    let response = backend.generate(&request).await?;

    let sub_queries: Vec<SubQuery> = parse_marked_lines(&response, SUBQUERY_MARKER, max_sub_queries)
        .into_iter()
        .enumerate()
        .map(|(index, text)| SubQuery { text, index })
        .collect();
    tracing::info!(count = sub_queries.len(), "planned sub-queries");
    Ok(sub_queries)
}

/// Expand one sub-query into at most `max_per_language` search queries for
/// each language in `languages`, one generation call per language.
///
/// A non-fatal failure for one language is logged and skipped so the
/// remaining languages still contribute; fatal failures propagate.
///
/// # Errors
///
/// Returns an error when a generation call fails fatally.
pub async fn plan_search_queries(
    backend: &dyn GenerationBackend,
    gate: &RequestGate,
    sub_query: &SubQuery,
    languages: &[String],
    max_per_language: usize,
) -> Result<Vec<SearchQuery>> {
    let mut queries = Vec::new();
    for language in languages {
        let request = GenerationRequest::new(
            search_query_prompt(max_per_language, language),
            &sub_query.text,
        );
        let _permit = gate.acquire().await;
        let response = match backend.generate(&request).await {
            Ok(text) => text,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!(
                    language = %language,
                    sub_query = sub_query.index,
                    error = %err,
                    "search-query planning failed for one language; skipping"
                );
                continue;
            }
        };

        let planned = parse_marked_lines(&response, QUERY_MARKER, max_per_language);
        tracing::debug!(
            language = %language,
            sub_query = sub_query.index,
            count = planned.len(),
            "planned search queries"
        );
        queries.extend(planned.into_iter().map(|text| SearchQuery {
            text,
            language: language.clone(),
            sub_query: sub_query.index,
        }));
    }
    Ok(queries)
}

fn sub_query_prompt(max: usize) -> String {
    format!(
        "You are a research planner. Break the topic the user provides into at \
         most {max} focused sub-queries that together cover it. Respond with \
         one line per sub-query, each line starting with '{SUBQUERY_MARKER}' \
         followed by the sub-query text. No numbering, no commentary."
    )
}

fn search_query_prompt(max: usize, language: &str) -> String {
    format!(
        "You are a search specialist. Write at most {max} web search queries \
         in the language with code '{language}' for the research question the \
         user provides. Keep queries short and keyword-oriented rather than \
         full sentences. Respond with one line per query, each line starting \
         with '{QUERY_MARKER}' followed by the query text. No numbering, no \
         commentary."
    )
}

/// Keep the text after `marker` on every line that starts with it,
/// trimmed, skipping lines whose payload is empty, up to `cap` lines.
fn parse_marked_lines(text: &str, marker: &str, cap: usize) -> Vec<String> {
    let mut extracted = Vec::new();
    for line in text.lines() {
        let Some(payload) = line.trim().strip_prefix(marker) else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        extracted.push(payload.to_owned());
        if extracted.len() == cap {
            break;
        }
    }
    extracted
}
