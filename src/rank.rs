//! Generic rubric-based ranking with top-k selection.
//!
//! One algorithm serves both ranking passes: search-result snippets before
//! fetching, and summaries before synthesis. Each candidate is scored by
//! the generation backend against a five-part rubric returned as a fenced
//! JSON object; the sub-scores are averaged and rounded to one decimal
//! place. A candidate whose score cannot be parsed, or whose scoring call
//! fails recoverably, scores 0 instead of being dropped, so every input
//! item appears exactly once in the output.

use std::cmp::Ordering;

use futures_util::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gate::RequestGate;
use crate::llm::{GenerationBackend, GenerationRequest};

/// Rubric fields the backend is asked to score, each 0-10.
const SUB_SCORE_FIELDS: [&str; 5] = [
    "relevance",
    "direction",
    "credibility",
    "structure",
    "completeness",
];

const RUBRIC_PROMPT: &str = "You are a research relevance judge. Score the candidate text the \
user provides against the research topic and focus. Respond with only a fenced JSON object:\n\
```json\n\
{\"title\": \"short label\", \"relevance\": 0, \"direction\": 0, \"credibility\": 0, \
\"structure\": 0, \"completeness\": 0}\n\
```\n\
Each score is a number from 0 to 10: relevance = how well the text matches the topic, \
direction = how well it follows the stated focus, credibility = how trustworthy the text \
appears, structure = how well-organised it is, completeness = how fully it covers its \
subject. No commentary outside the JSON.";

/// A candidate the ranking engine can score.
pub trait Rankable {
    /// Text the rubric judges.
    fn representative_text(&self) -> &str;

    /// Stable identity for logs, usually the source URL.
    fn source_identity(&self) -> &str;

    /// Per-item focus for the `direction` sub-score. Empty means the
    /// rubric falls back to overall topic coverage.
    fn direction_hint(&self) -> &str {
        ""
    }
}

/// A ranked candidate: the item, its rubric score, and its position in
/// the ranking input, which is the tie-break order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredItem<T> {
    pub item: T,
    /// Rubric score in [0, 10], one decimal place.
    pub score: f64,
    /// Index in the ranking input.
    pub position: usize,
}

/// Score every item and return them sorted descending by score, ties
/// broken by input order. Scoring calls run concurrently up to
/// `concurrency`, each under a generation permit.
///
/// # Errors
///
/// Returns an error only when a scoring call fails fatally (rejected
/// credentials); recoverable failures score the item 0 instead.
pub async fn rank<T>(
    backend: &dyn GenerationBackend,
    gate: &RequestGate,
    items: Vec<T>,
    topic: &str,
    concurrency: usize,
) -> Result<Vec<ScoredItem<T>>>
where
    T: Rankable + Send + Sync,
{
    let scores: Vec<f64> = stream::iter(items.iter().map(|item| async move {
        let request = GenerationRequest::new(RUBRIC_PROMPT, rubric_user_message(topic, item));
        let _permit = gate.acquire().await;
        match backend.generate(&request).await {
            Ok(text) => {
                let score = parse_score(&text);
                tracing::debug!(source = %item.source_identity(), score, "ranked candidate");
                Ok(score)
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::warn!(
                    source = %item.source_identity(),
                    error = %err,
                    "scoring call failed; scoring 0"
                );
                Ok(0.0)
            }
        }
    }))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    let mut ranked: Vec<ScoredItem<T>> = items
        .into_iter()
        .zip(scores)
        .enumerate()
        .map(|(position, (item, score))| ScoredItem {
            item,
            score,
            position,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    tracing::info!(count = ranked.len(), "ranking complete");
    Ok(ranked)
}

/// First `k` of a ranked list, or all of it when shorter.
pub fn select_top_k<T>(mut ranked: Vec<ScoredItem<T>>, k: usize) -> Vec<ScoredItem<T>> {
    ranked.truncate(k);
    ranked
}

fn rubric_user_message<T: Rankable>(topic: &str, item: &T) -> String {
    let hint = item.direction_hint();
    let focus = if hint.is_empty() {
        "overall coverage of the topic"
    } else {
        hint
    };
    format!(
        "Topic: {topic}\nFocus: {focus}\n\nCandidate text:\n{text}",
        text = item.representative_text()
    )
}

/// Decode a rubric response into a score. Present sub-scores are clamped
/// to [0, 10] and averaged; a bare `final` field is used only when no
/// sub-score is present; anything undecodable scores 0.
fn parse_score(text: &str) -> f64 {
    let Some(block) = extract_json_block(text) else {
        return 0.0;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(block) else {
        return 0.0;
    };

    let sub_scores: Vec<f64> = SUB_SCORE_FIELDS
        .iter()
        .filter_map(|field| value[field].as_f64())
        .map(|score| score.clamp(0.0, 10.0))
        .collect();
    if !sub_scores.is_empty() {
        let mean = sub_scores.iter().sum::<f64>() / sub_scores.len() as f64;
        return round_one_decimal(mean);
    }

    value["final"]
        .as_f64()
        .map(|score| round_one_decimal(score.clamp(0.0, 10.0)))
        .unwrap_or(0.0)
}

/// Pull the JSON object out of a ```json fence, or accept a bare object
/// when the backend skipped the fence.
fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        let end = rest.find("```")?;
        return Some(rest[..end].trim());
    }
    let trimmed = text.trim();
    trimmed.starts_with('{').then_some(trimmed)
}

fn round_one_decimal(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}
