//! Final answer synthesis from the top-ranked summaries.
//!
//! The synthesizer is the one stage that must always produce output: a
//! failed or empty generation falls back to a labeled concatenation of
//! the summaries, and a missing sources section is appended, so every
//! run ends with a readable answer that names its sources.

use tracing::{info, warn};

use crate::docs::Summary;
use crate::gate::RequestGate;
use crate::llm::{GenerationBackend, GenerationRequest};

/// Heading the answer must carry; appended when the model leaves it out.
pub const SOURCES_HEADING: &str = "## Sources";

/// The drafted answer and the URLs it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDraft {
    /// Markdown answer body, always ending with a sources section when
    /// any summaries were supplied.
    pub body: String,
    /// Source URLs in ranked order, one per supplied summary.
    pub citations: Vec<String>,
    /// True when the body is the concatenation fallback rather than a
    /// model-written answer.
    pub fallback: bool,
}

/// Draft one coherent answer for `topic` from the ranked summaries.
///
/// Never fails: an empty or failed generation degrades to a labeled
/// concatenation of the summaries with the failure logged.
pub async fn synthesize(
    backend: &dyn GenerationBackend,
    gate: &RequestGate,
    topic: &str,
    summaries: &[Summary],
) -> AnswerDraft {
    if summaries.is_empty() {
        warn!("no summaries survived ranking; drafting a stub answer");
        return fallback_draft(topic, summaries);
    }

    let request = synthesis_request(topic, summaries);
    let generated = {
        let _permit = gate.acquire().await;
        match backend.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
            Ok(_) => {
                warn!("synthesis returned empty text");
                None
            }
            Err(err) => {
                warn!(error = %err, "synthesis call failed");
                None
            }
        }
    };

    let draft = match generated {
        Some(text) => AnswerDraft {
            body: ensure_sources_section(text, summaries),
            citations: summaries.iter().map(|s| s.url.clone()).collect(),
            fallback: false,
        },
        None => fallback_draft(topic, summaries),
    };
    info!(
        chars = draft.body.len(),
        sources = summaries.len(),
        fallback = draft.fallback,
        "answer drafted"
    );
    draft
}

/// Build the deterministic fallback draft without calling the backend.
///
/// Used when generation produces nothing usable and when a cancelled run
/// wraps up with whatever summaries it has.
pub fn fallback_draft(topic: &str, summaries: &[Summary]) -> AnswerDraft {
    let citations: Vec<String> = summaries.iter().map(|s| s.url.clone()).collect();
    let body = if summaries.is_empty() {
        format!("# {topic}\n\nNo usable sources were retrieved for this topic.")
    } else {
        ensure_sources_section(concatenated_answer(topic, summaries), summaries)
    };
    AnswerDraft {
        body,
        citations,
        fallback: true,
    }
}

fn synthesis_request(topic: &str, summaries: &[Summary]) -> GenerationRequest {
    let mut sources = String::new();
    for (position, summary) in summaries.iter().enumerate() {
        sources.push_str(&format!(
            "### Source {number}: {title}\nURL: {url}\n{text}\n\n",
            number = position + 1,
            title = source_label(summary),
            url = summary.url,
            text = summary.text,
        ));
    }
    let system = "You are a research writer producing the final report of a web \
                  research run. Write clear Markdown and cite only the sources \
                  you are given.";
    let user = format!(
        "Research topic: {topic}\n\n\
         Write one coherent, structured answer to the topic using only the \
         numbered sources below: an introduction, thematic sections with \
         headings, and a conclusion. Cite sources inline as [Source N](url) \
         wherever a claim rests on one. Finish with a `## Sources` section \
         listing every source you used.\n\n{sources}"
    );
    GenerationRequest::new(system, user)
}

/// Deterministic answer used when the model produces nothing usable.
fn concatenated_answer(topic: &str, summaries: &[Summary]) -> String {
    let mut out = format!("# {topic}\n");
    for (position, summary) in summaries.iter().enumerate() {
        out.push_str(&format!(
            "\n## Source {number}: {title}\n\n{text}\n\n[{url}]({url})\n",
            number = position + 1,
            title = source_label(summary),
            text = summary.text,
            url = summary.url,
        ));
    }
    out
}

/// Append the sources list when the answer lacks one, so every supplied
/// URL appears in the final text at least once.
fn ensure_sources_section(body: String, summaries: &[Summary]) -> String {
    if body.contains(SOURCES_HEADING) {
        return body;
    }
    let mut out = body;
    out.push_str("\n\n");
    out.push_str(SOURCES_HEADING);
    out.push('\n');
    for (position, summary) in summaries.iter().enumerate() {
        out.push_str(&format!(
            "\n{number}. [{title}]({url})",
            number = position + 1,
            title = source_label(summary),
            url = summary.url,
        ));
    }
    out
}

fn source_label(summary: &Summary) -> &str {
    if summary.title.trim().is_empty() {
        &summary.url
    } else {
        &summary.title
    }
}
