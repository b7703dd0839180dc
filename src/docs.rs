//! Page retrieval and summarisation with cache-backed idempotence.
//!
//! Documents and their summaries are the most expensive artefacts of a
//! run, so both are cached on disk keyed by normalised URL and guarded
//! by a single-flight lock: concurrent requests for the same URL do the
//! work once and share the stored result. Re-running a topic re-reads
//! everything already on disk and only pays for what is missing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scry_search::orchestrator::url_normalize::normalize_url;
use scry_search::{FetchConfig, PageContent, SearchResult};

use crate::cache::{CacheManager, NAMESPACE_DOCS, NAMESPACE_SUMMARIES, SingleFlight};
use crate::error::{Result, ScryError};
use crate::gate::RequestGate;
use crate::llm::{GenerationBackend, GenerationRequest};
use crate::rank::Rankable;

/// Inputs shorter than this many words get the compact summary prompt;
/// longer inputs get the sectioned one.
pub const SHORT_INPUT_WORDS: usize = 500;

/// Headroom over the HTTP client's own timeout so the outer ceiling
/// also covers HTML extraction on oversized pages.
const FETCH_GRACE_SECONDS: u64 = 5;

/// Full text retrieved for one search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub text: String,
    pub word_count: usize,
}

impl Document {
    /// Which summary style this document's length calls for.
    pub fn length_class(&self) -> LengthClass {
        if self.word_count < SHORT_INPUT_WORDS {
            LengthClass::Short
        } else {
            LengthClass::Long
        }
    }
}

/// Input-length bucket that selected the summary prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthClass {
    Short,
    Long,
}

/// Model-written condensation of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub url: String,
    pub title: String,
    pub text: String,
    pub input_class: LengthClass,
}

impl Rankable for Summary {
    fn representative_text(&self) -> &str {
        &self.text
    }

    fn source_identity(&self) -> &str {
        &self.url
    }
}

/// Cache-backed fetch and summarise layer.
///
/// Both operations are at-most-once per URL within a run: a per-key
/// async lock is held across the lookup-miss-work-store sequence, so
/// concurrent callers for the same page wait for the first one and then
/// read its cached result.
#[derive(Debug)]
pub struct DocumentStore {
    cache: CacheManager,
    flight: SingleFlight,
    fetch_config: FetchConfig,
    summary_input_max_chars: usize,
}

impl DocumentStore {
    pub fn new(
        cache: CacheManager,
        fetch_config: FetchConfig,
        summary_input_max_chars: usize,
    ) -> Self {
        Self {
            cache,
            flight: SingleFlight::new(),
            fetch_config,
            summary_input_max_chars,
        }
    }

    /// Retrieve the page behind `result`, from cache when possible.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures (timeout, HTTP, unreadable content) for
    /// the caller to record against this one item; a failed cache write
    /// is logged and does not fail the fetch.
    pub async fn fetch_document(
        &self,
        gate: &RequestGate,
        topic: &str,
        result: &SearchResult,
    ) -> Result<Document> {
        let topic_id = CacheManager::topic_id(topic);
        let key = normalize_url(&result.url);
        let _guard = self.flight.acquire(&flight_key(NAMESPACE_DOCS, &key)).await;

        if let Some(document) = self.cache.get::<Document>(&topic_id, NAMESPACE_DOCS, &key) {
            debug!(url = %result.url, "document served from cache");
            return Ok(document);
        }

        let _permit = gate.acquire().await;
        let ceiling = Duration::from_secs(self.fetch_config.timeout_seconds + FETCH_GRACE_SECONDS);
        let page = tokio::time::timeout(
            ceiling,
            scry_search::fetch_page_content(&result.url, &self.fetch_config),
        )
        .await
        .map_err(|_| {
            ScryError::Timeout(format!(
                "fetching {} exceeded {}s",
                result.url,
                ceiling.as_secs()
            ))
        })??;

        let document = document_from_page(page, result);
        debug!(url = %document.url, words = document.word_count, "fetched document");

        if let Err(err) = self.cache.put(&topic_id, NAMESPACE_DOCS, &key, &document) {
            warn!(url = %document.url, error = %err, "failed to cache document");
        }
        Ok(document)
    }

    /// Summarise `document` for the research topic, from cache when
    /// possible.
    ///
    /// Inputs under [`SHORT_INPUT_WORDS`] words get a compact
    /// single-paragraph instruction; longer inputs get a sectioned one.
    /// The document text is truncated to the configured maximum input
    /// size before submission.
    ///
    /// # Errors
    ///
    /// Propagates generation failures for the caller to record against
    /// this one item; a failed cache write is logged and does not fail
    /// the summary.
    pub async fn summarize(
        &self,
        backend: &dyn GenerationBackend,
        gate: &RequestGate,
        topic: &str,
        document: &Document,
    ) -> Result<Summary> {
        let topic_id = CacheManager::topic_id(topic);
        let key = normalize_url(&document.url);
        let _guard = self
            .flight
            .acquire(&flight_key(NAMESPACE_SUMMARIES, &key))
            .await;

        if let Some(summary) = self.cache.get::<Summary>(&topic_id, NAMESPACE_SUMMARIES, &key) {
            debug!(url = %document.url, "summary served from cache");
            return Ok(summary);
        }

        let _permit = gate.acquire().await;
        let input_class = document.length_class();
        let input = truncate_at_boundary(&document.text, self.summary_input_max_chars);
        let request = summary_request(topic, document, input, input_class);
        let text = backend.generate(&request).await?;

        let summary = Summary {
            url: document.url.clone(),
            title: document.title.clone(),
            text: text.trim().to_owned(),
            input_class,
        };
        if let Err(err) = self.cache.put(&topic_id, NAMESPACE_SUMMARIES, &key, &summary) {
            warn!(url = %document.url, error = %err, "failed to cache summary");
        }
        Ok(summary)
    }
}

fn flight_key(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

/// Reader-proxy responses carry no title, so fall back to the search
/// result's.
fn document_from_page(page: PageContent, result: &SearchResult) -> Document {
    let title = if page.title.trim().is_empty() {
        result.title.clone()
    } else {
        page.title
    };
    Document {
        url: page.url,
        title,
        text: page.text,
        word_count: page.word_count,
    }
}

/// Cut `text` at `max_bytes` without splitting a UTF-8 code point.
fn truncate_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn summary_request(
    topic: &str,
    document: &Document,
    input: &str,
    class: LengthClass,
) -> GenerationRequest {
    let system = "You are a research assistant condensing web pages for a report. \
                  Stay strictly faithful to the source text and never add outside \
                  knowledge.";
    let instructions = match class {
        LengthClass::Short => {
            "Summarise the text below in one compact paragraph. Keep every \
             concrete fact, number, name, and date relevant to the research topic."
        }
        LengthClass::Long => {
            "Write a structured Markdown summary of the text below: a one-line \
             gist, then short sections covering the main points, key facts and \
             figures, and any caveats or open questions. Keep every concrete \
             fact, number, name, and date relevant to the research topic."
        }
    };
    let user = format!(
        "Research topic: {topic}\n\n{instructions}\n\nTitle: {title}\nText:\n{input}",
        title = document.title,
    );
    GenerationRequest::new(system, user)
}
