//! Pipeline driver: plan → search → rank → fetch/summarise → rank →
//! synthesise.
//!
//! The driver owns the cross-cutting machinery the stages stay free of:
//! per-stage cache persistence (so an interrupted run resumes where it
//! stopped), per-item failure accounting, cancellation, and the
//! terminal artifacts (`answer.md`, `answer.html`, `request.md`). Only
//! authentication and configuration failures abort a run; everything
//! else degrades the candidate set and is reported at the end.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use pulldown_cmark::{Options, Parser, html};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{
    CacheManager, NAMESPACE_RANKED_RESULTS, NAMESPACE_RANKED_SUMMARIES, NAMESPACE_SEARCH_QUERIES,
    NAMESPACE_SEARCH_RESULTS,
};
use crate::config::ScryConfig;
use crate::docs::{Document, DocumentStore, Summary};
use crate::error::{Result, ScryError};
use crate::executor::{self, Candidate, ExecutionOutcome};
use crate::gate::ProviderGates;
use crate::llm::{GenerationBackend, OpenAiClient};
use crate::planner::{self, SearchQuery, SubQuery};
use crate::rank::{self, ScoredItem};
use crate::synthesize;

/// Cache key for the planned sub-query list.
const SUB_QUERIES_KEY: &str = "sub_queries";
/// Cache key for the merged, deduplicated search round.
const RESULTS_KEY: &str = "results";
/// Cache key for a ranked list within its namespace.
const RANKED_KEY: &str = "ranked";

/// One degraded item: which stage, which item, what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: &'static str,
    pub item: String,
    pub error: String,
}

/// What a run did, stage by stage. Logged at run end and summarised in
/// `request.md`.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub topic: String,
    pub topic_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sub_queries: usize,
    pub search_queries: usize,
    /// Candidates surviving dedup.
    pub results_found: usize,
    pub duplicates_dropped: usize,
    pub documents_fetched: usize,
    pub summaries_written: usize,
    pub sources_cited: usize,
    /// True when the answer is the concatenation fallback.
    pub fallback_answer: bool,
    /// True when the run was cancelled and wrapped up early.
    pub cancelled: bool,
    pub failures: Vec<StageFailure>,
    pub answer_path: PathBuf,
}

#[derive(Debug, Default)]
struct StageCounts {
    sub_queries: usize,
    search_queries: usize,
    results_found: usize,
    duplicates_dropped: usize,
    documents_fetched: usize,
    summaries_written: usize,
}

/// The research pipeline, wired to one configuration and one generation
/// backend. Reusable across topics; each [`run`](Self::run) is an
/// independent research pass sharing the on-disk cache.
pub struct Pipeline {
    config: ScryConfig,
    backend: Arc<dyn GenerationBackend>,
    gates: ProviderGates,
    cache: CacheManager,
    store: DocumentStore,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline over an explicit generation backend.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Config`] when the configuration fails
    /// validation.
    pub fn new(config: ScryConfig, backend: Arc<dyn GenerationBackend>) -> Result<Self> {
        config.validate()?;
        let cache_root = config
            .cache
            .root
            .clone()
            .unwrap_or_else(crate::scry_dirs::cache_dir);
        let cache = CacheManager::new(cache_root, config.cache.max_age_days);
        let store = DocumentStore::new(
            cache.clone(),
            config.fetch_config(),
            summary_input_limit(&config),
        );
        let gates = ProviderGates::from_config(&config);
        Ok(Self {
            config,
            backend,
            gates,
            cache,
            store,
            cancel: CancellationToken::new(),
        })
    }

    /// Build a pipeline backed by the configured OpenAI-compatible
    /// provider.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Config`] for invalid configuration.
    pub fn from_config(config: ScryConfig) -> Result<Self> {
        let backend = Arc::new(OpenAiClient::from_config(&config.llm)?);
        Self::new(config, backend)
    }

    /// Token that, once cancelled, makes the run stop issuing new
    /// external calls and wrap up with whatever it has.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Access to the cache manager this pipeline writes through.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Research `topic` end to end and write the answer artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Pipeline`] for a blank topic and propagates
    /// fatal (authentication / configuration) provider errors. Per-item
    /// failures degrade the run and are returned in the report instead.
    pub async fn run(&self, topic: &str) -> Result<RunReport> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ScryError::Pipeline("research topic is empty".into()));
        }
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let topic_id = CacheManager::topic_id(topic);
        info!(%run_id, topic, %topic_id, "research run started");

        let mut failures = Vec::new();
        let mut counts = StageCounts::default();
        let top_summaries = self
            .gather_summaries(topic, &topic_id, &mut failures, &mut counts)
            .await?;

        let cancelled = self.cancel.is_cancelled();
        let draft = if cancelled {
            info!("cancellation observed; wrapping up without further calls");
            synthesize::fallback_draft(topic, &top_summaries)
        } else {
            synthesize::synthesize(
                self.backend.as_ref(),
                &self.gates.llm,
                topic,
                &top_summaries,
            )
            .await
        };

        let answer_path = self.cache.write_artifact(&topic_id, "answer.md", &draft.body)?;
        self.cache.write_artifact(
            &topic_id,
            "answer.html",
            &render_html_page(topic, &draft.body),
        )?;

        let report = RunReport {
            run_id,
            topic: topic.to_owned(),
            topic_id,
            started_at,
            finished_at: Utc::now(),
            sub_queries: counts.sub_queries,
            search_queries: counts.search_queries,
            results_found: counts.results_found,
            duplicates_dropped: counts.duplicates_dropped,
            documents_fetched: counts.documents_fetched,
            summaries_written: counts.summaries_written,
            sources_cited: draft.citations.len(),
            fallback_answer: draft.fallback,
            cancelled,
            failures,
            answer_path,
        };
        self.cache
            .write_artifact(&report.topic_id, "request.md", &render_request_md(&report))?;
        log_report(&report);
        Ok(report)
    }

    /// Run every gathering stage and return the top summaries for
    /// synthesis. Checks for cancellation at stage boundaries and
    /// returns whatever is in hand when it fires.
    async fn gather_summaries(
        &self,
        topic: &str,
        topic_id: &str,
        failures: &mut Vec<StageFailure>,
        counts: &mut StageCounts,
    ) -> Result<Vec<Summary>> {
        if self.cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let sub_queries = self.plan_sub_queries_stage(topic, topic_id, failures).await?;
        counts.sub_queries = sub_queries.len();
        if self.cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let queries = self
            .plan_search_queries_stage(topic_id, &sub_queries)
            .await?;
        counts.search_queries = queries.len();
        if self.cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let outcome = self
            .search_stage(topic_id, &sub_queries, &queries, failures)
            .await?;
        counts.results_found = outcome.candidates.len();
        counts.duplicates_dropped = outcome.duplicates_dropped;
        if outcome.candidates.is_empty() || self.cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let ranked = self
            .rank_candidates_stage(topic, topic_id, outcome.candidates)
            .await?;
        let top = rank::select_top_k(ranked, self.config.pipeline.top_results);
        if self.cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let documents = self.fetch_stage(topic, &top, failures).await?;
        counts.documents_fetched = documents.len();
        if self.cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let summaries = self.summarize_stage(topic, &documents, failures).await?;
        counts.summaries_written = summaries.len();
        if summaries.is_empty() {
            return Ok(summaries);
        }
        if self.cancel.is_cancelled() {
            let mut partial = summaries;
            partial.truncate(self.config.pipeline.top_results);
            return Ok(partial);
        }

        let ranked = self.rank_summaries_stage(topic, topic_id, summaries).await?;
        Ok(
            rank::select_top_k(ranked, self.config.pipeline.top_results)
                .into_iter()
                .map(|scored| scored.item)
                .collect(),
        )
    }

    /// Plan the sub-queries, reusing a cached plan when present. A
    /// failed or empty plan degrades to researching the topic itself.
    async fn plan_sub_queries_stage(
        &self,
        topic: &str,
        topic_id: &str,
        failures: &mut Vec<StageFailure>,
    ) -> Result<Vec<SubQuery>> {
        if let Some(cached) = self.cache.get::<Vec<SubQuery>>(
            topic_id,
            NAMESPACE_SEARCH_QUERIES,
            SUB_QUERIES_KEY,
        ) {
            info!(count = cached.len(), "sub-queries loaded from cache");
            return Ok(cached);
        }

        let planned = match planner::plan_sub_queries(
            self.backend.as_ref(),
            &self.gates.llm,
            topic,
            self.config.pipeline.max_subqueries,
        )
        .await
        {
            Ok(list) => list,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(error = %err, "sub-query planning failed; researching the topic directly");
                failures.push(StageFailure {
                    stage: "plan",
                    item: topic.to_owned(),
                    error: err.to_string(),
                });
                Vec::new()
            }
        };

        if planned.is_empty() {
            // Not cached: a later run should retry planning.
            return Ok(vec![SubQuery {
                text: topic.to_owned(),
                index: 0,
            }]);
        }
        if let Err(err) =
            self.cache
                .put(topic_id, NAMESPACE_SEARCH_QUERIES, SUB_QUERIES_KEY, &planned)
        {
            warn!(error = %err, "failed to cache sub-queries");
        }
        Ok(planned)
    }

    /// Plan search queries per sub-query, reusing cached plans. A
    /// sub-query that yields nothing is searched verbatim in the primary
    /// language.
    async fn plan_search_queries_stage(
        &self,
        topic_id: &str,
        sub_queries: &[SubQuery],
    ) -> Result<Vec<SearchQuery>> {
        let languages = &self.config.pipeline.languages;
        let mut all = Vec::new();
        for sub in sub_queries {
            let key = format!("queries:{}", sub.text);
            if let Some(cached) =
                self.cache
                    .get::<Vec<SearchQuery>>(topic_id, NAMESPACE_SEARCH_QUERIES, &key)
            {
                debug!(sub_query = %sub.text, count = cached.len(), "search queries loaded from cache");
                all.extend(cached);
                continue;
            }

            let planned = planner::plan_search_queries(
                self.backend.as_ref(),
                &self.gates.llm,
                sub,
                languages,
                self.config.pipeline.max_queries_per_language,
            )
            .await?;

            if planned.is_empty() {
                warn!(sub_query = %sub.text, "no search queries planned; searching it verbatim");
                let language = languages.first().cloned().unwrap_or_else(|| "en".to_owned());
                all.push(SearchQuery {
                    text: sub.text.clone(),
                    language,
                    sub_query: sub.index,
                });
            } else {
                if let Err(err) =
                    self.cache
                        .put(topic_id, NAMESPACE_SEARCH_QUERIES, &key, &planned)
                {
                    warn!(error = %err, "failed to cache search queries");
                }
                all.extend(planned);
            }
        }
        Ok(all)
    }

    /// Execute the search round, reusing a cached round when present.
    async fn search_stage(
        &self,
        topic_id: &str,
        sub_queries: &[SubQuery],
        queries: &[SearchQuery],
        failures: &mut Vec<StageFailure>,
    ) -> Result<ExecutionOutcome> {
        if let Some(cached) =
            self.cache
                .get::<ExecutionOutcome>(topic_id, NAMESPACE_SEARCH_RESULTS, RESULTS_KEY)
        {
            info!(
                candidates = cached.candidates.len(),
                "search results loaded from cache"
            );
            return Ok(cached);
        }

        let outcome = executor::execute(&self.gates.search, &self.config, sub_queries, queries).await?;
        for failure in &outcome.failures {
            failures.push(StageFailure {
                stage: "search",
                item: failure.query.clone(),
                error: failure.error.clone(),
            });
        }
        if !outcome.candidates.is_empty() {
            if let Err(err) =
                self.cache
                    .put(topic_id, NAMESPACE_SEARCH_RESULTS, RESULTS_KEY, &outcome)
            {
                warn!(error = %err, "failed to cache search results");
            }
        }
        Ok(outcome)
    }

    /// Rank snippet candidates, reusing a cached ranking when present.
    async fn rank_candidates_stage(
        &self,
        topic: &str,
        topic_id: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredItem<Candidate>>> {
        if let Some(cached) = self.cache.get::<Vec<ScoredItem<Candidate>>>(
            topic_id,
            NAMESPACE_RANKED_RESULTS,
            RANKED_KEY,
        ) {
            info!(count = cached.len(), "snippet ranking loaded from cache");
            return Ok(cached);
        }

        let ranked = rank::rank(
            self.backend.as_ref(),
            &self.gates.llm,
            candidates,
            topic,
            self.config.pipeline.rank_concurrency,
        )
        .await?;
        if let Err(err) = self
            .cache
            .put(topic_id, NAMESPACE_RANKED_RESULTS, RANKED_KEY, &ranked)
        {
            warn!(error = %err, "failed to cache snippet ranking");
        }
        Ok(ranked)
    }

    /// Fetch the top-ranked documents under the fetch pool. A failed
    /// fetch drops that one candidate.
    async fn fetch_stage(
        &self,
        topic: &str,
        top: &[ScoredItem<Candidate>],
        failures: &mut Vec<StageFailure>,
    ) -> Result<Vec<Document>> {
        let outcomes: Vec<(String, Result<Option<Document>>)> =
            stream::iter(top.iter().map(|scored| async move {
                let url = scored.item.result.url.clone();
                if self.cancel.is_cancelled() {
                    return (url, Ok(None));
                }
                let fetched = self
                    .store
                    .fetch_document(&self.gates.reader, topic, &scored.item.result)
                    .await;
                (url, fetched.map(Some))
            }))
            .buffered(self.config.pipeline.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut documents = Vec::new();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(%url, error = %err, "document fetch failed");
                    failures.push(StageFailure {
                        stage: "fetch",
                        item: url,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(documents)
    }

    /// Summarise the fetched documents under the summarise pool. A
    /// failed summary drops that one document.
    async fn summarize_stage(
        &self,
        topic: &str,
        documents: &[Document],
        failures: &mut Vec<StageFailure>,
    ) -> Result<Vec<Summary>> {
        let outcomes: Vec<(String, Result<Option<Summary>>)> =
            stream::iter(documents.iter().map(|document| async move {
                let url = document.url.clone();
                if self.cancel.is_cancelled() {
                    return (url, Ok(None));
                }
                let summarised = self
                    .store
                    .summarize(self.backend.as_ref(), &self.gates.llm, topic, document)
                    .await;
                (url, summarised.map(Some))
            }))
            .buffered(self.config.pipeline.summarize_concurrency.max(1))
            .collect()
            .await;

        let mut summaries = Vec::new();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(%url, error = %err, "summarisation failed");
                    failures.push(StageFailure {
                        stage: "summarize",
                        item: url,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(summaries)
    }

    /// Rank summaries for citation, reusing a cached ranking when
    /// present.
    async fn rank_summaries_stage(
        &self,
        topic: &str,
        topic_id: &str,
        summaries: Vec<Summary>,
    ) -> Result<Vec<ScoredItem<Summary>>> {
        if let Some(cached) = self.cache.get::<Vec<ScoredItem<Summary>>>(
            topic_id,
            NAMESPACE_RANKED_SUMMARIES,
            RANKED_KEY,
        ) {
            info!(count = cached.len(), "summary ranking loaded from cache");
            return Ok(cached);
        }

        let ranked = rank::rank(
            self.backend.as_ref(),
            &self.gates.llm,
            summaries,
            topic,
            self.config.pipeline.rank_concurrency,
        )
        .await?;
        if let Err(err) =
            self.cache
                .put(topic_id, NAMESPACE_RANKED_SUMMARIES, RANKED_KEY, &ranked)
        {
            warn!(error = %err, "failed to cache summary ranking");
        }
        Ok(ranked)
    }
}

/// Maximum characters of document text submitted for one summary,
/// sized from the response budget at roughly four characters per token.
fn summary_input_limit(config: &ScryConfig) -> usize {
    config.llm.max_tokens.saturating_mul(4)
}

fn log_report(report: &RunReport) {
    info!(
        run_id = %report.run_id,
        sub_queries = report.sub_queries,
        search_queries = report.search_queries,
        results = report.results_found,
        duplicates = report.duplicates_dropped,
        documents = report.documents_fetched,
        summaries = report.summaries_written,
        cited = report.sources_cited,
        fallback = report.fallback_answer,
        cancelled = report.cancelled,
        degraded = report.failures.len(),
        answer = %report.answer_path.display(),
        "run complete"
    );
    for failure in &report.failures {
        warn!(
            stage = failure.stage,
            item = %failure.item,
            error = %failure.error,
            "degraded item"
        );
    }
}

/// Render the run metadata companion to `answer.md`.
fn render_request_md(report: &RunReport) -> String {
    format!(
        "# Research request\n\n\
         - Topic: {topic}\n\
         - Run id: {run_id}\n\
         - Started: {started}\n\
         - Finished: {finished}\n\
         - Sub-queries: {subs}\n\
         - Search queries: {queries}\n\
         - Results after dedup: {results} ({duplicates} duplicates dropped)\n\
         - Documents fetched: {documents}\n\
         - Summaries written: {summaries}\n\
         - Sources cited: {cited}\n\
         - Degraded items: {degraded}\n",
        topic = report.topic,
        run_id = report.run_id,
        started = report.started_at.to_rfc3339(),
        finished = report.finished_at.to_rfc3339(),
        subs = report.sub_queries,
        queries = report.search_queries,
        results = report.results_found,
        duplicates = report.duplicates_dropped,
        documents = report.documents_fetched,
        summaries = report.summaries_written,
        cited = report.sources_cited,
        degraded = report.failures.len(),
    )
}

const HTML_STYLE: &str = "\
:root { color-scheme: light dark; }\n\
body { font-family: system-ui, sans-serif; line-height: 1.6; margin: 0; }\n\
main { max-width: 46rem; margin: 0 auto; padding: 2rem 1rem 4rem; }\n\
h1, h2, h3 { line-height: 1.25; }\n\
a { color: #1a6baa; }\n\
code, pre { font-family: ui-monospace, monospace; background: rgba(127, 127, 127, 0.12); border-radius: 4px; }\n\
pre { padding: 0.75rem; overflow-x: auto; }\n\
code { padding: 0.1rem 0.3rem; }\n\
blockquote { border-left: 3px solid rgba(127, 127, 127, 0.4); margin-left: 0; padding-left: 1rem; }\n";

/// Render the answer as a standalone HTML page.
fn render_html_page(title: &str, markdown: &str) -> String {
    let parser = Parser::new_ext(
        markdown,
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
    );
    let mut body = String::new();
    html::push_html(&mut body, parser);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>\n{HTML_STYLE}</style>\n</head>\n<body>\n\
         <main>\n{body}</main>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
