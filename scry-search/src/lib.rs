//! # scry-search
//!
//! Web search and page retrieval for Scry.
//!
//! This crate queries a self-hosted SearXNG instance and DuckDuckGo's
//! HTML endpoint concurrently, merges and ranks the results, and can
//! fetch full page text for any result URL — either directly with local
//! boilerplate stripping, or through a reader proxy that returns
//! pre-extracted text.
//!
//! ## Design
//!
//! - SearXNG speaks JSON; DuckDuckGo is scraped with CSS selectors
//! - Engines are queried concurrently and merged in submission order
//! - Duplicate URLs are dropped first-wins after tracking-parameter
//!   normalisation
//! - An in-memory memo with configurable TTL absorbs repeated queries
//! - Graceful degradation: one engine failing still yields results
//!
//! ## Security
//!
//! - SearXNG credentials travel only as HTTP Basic auth headers and
//!   never appear in logs or error messages
//! - No network listeners — this is a library, not a server
//! - Queries are logged at debug level, never at info

pub mod cache;
pub mod config;
pub mod content;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod types;

pub use config::{FetchConfig, SearchConfig};
pub use engine::SearchEngineTrait;
pub use error::{Result, SearchError};
pub use types::{PageContent, SearchEngine, SearchResult};

/// Search the web using the configured engines concurrently.
///
/// Queries every engine in `config.engines`, merges results in engine
/// submission order, deduplicates by normalised URL (first occurrence
/// wins), orders by weighted score, and returns up to
/// `config.max_results` results. Identical queries within the memo TTL
/// are served from memory.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the configuration is invalid and
/// [`SearchError::AllEnginesFailed`] if every enabled engine fails.
/// Individual engine failures are logged but tolerated as long as at
/// least one engine responds.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> scry_search::Result<()> {
/// let config = scry_search::SearchConfig {
///     searxng_base_url: Some("http://localhost:8888".into()),
///     ..Default::default()
/// };
/// let results = scry_search::search("rust async runtimes", &config).await?;
/// for result in &results {
///     println!("{}: {}", result.title, result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    config.validate()?;

    let memoised = config.cache_ttl_seconds > 0;
    let key = cache::MemoKey::new(query, config);
    if memoised {
        if let Some(hit) = cache::get(&key, config.cache_ttl_seconds).await {
            tracing::debug!(count = hit.len(), "search memo hit");
            return Ok(hit);
        }
    }

    let results = orchestrator::search::orchestrate_search(query, config).await?;

    if memoised {
        cache::insert(key, results.clone(), config.cache_ttl_seconds).await;
    }
    Ok(results)
}

/// Search the web with default configuration (DuckDuckGo only, since
/// SearXNG needs a base URL).
///
/// # Errors
///
/// Same as [`search`].
pub async fn search_default(query: &str) -> Result<Vec<SearchResult>> {
    let config = SearchConfig {
        engines: vec![SearchEngine::DuckDuckGo],
        ..Default::default()
    };
    search(query, &config).await
}

/// Fetch and extract readable text content from a web page.
///
/// With `config.reader_base_url` unset, downloads the page directly,
/// parses the HTML, strips boilerplate (navigation, ads, footers,
/// scripts), and returns the main content as clean text. With a reader
/// proxy configured, requests `{base}/{percent-encoded url}` and returns
/// the proxy's pre-extracted body instead.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] for an unparseable URL,
/// [`SearchError::Http`] / [`SearchError::Timeout`] if the page cannot
/// be fetched, and [`SearchError::Parse`] if no readable content can be
/// extracted.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> scry_search::Result<()> {
/// let config = scry_search::FetchConfig::default();
/// let page = scry_search::fetch_page_content("https://example.com", &config).await?;
/// println!("{} ({} words)", page.title, page.word_count);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_page_content(url: &str, config: &FetchConfig) -> Result<PageContent> {
    config.validate()?;

    let parsed = url::Url::parse(url)
        .map_err(|e| SearchError::Parse(format!("invalid url '{url}': {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SearchError::Parse(format!(
            "unsupported url scheme '{}'",
            parsed.scheme()
        )));
    }

    match config.reader_base_url.as_deref() {
        Some(base) => fetch_via_reader(parsed.as_str(), base, config).await,
        None => fetch_direct(parsed.as_str(), config).await,
    }
}

/// Fetch a page through a reader proxy that returns pre-extracted text.
async fn fetch_via_reader(url: &str, reader_base: &str, config: &FetchConfig) -> Result<PageContent> {
    let client = http::build_client(config.timeout_seconds, config.user_agent.as_deref())?;
    let endpoint = format!(
        "{}/{}",
        reader_base.trim_end_matches('/'),
        urlencoding::encode(url)
    );

    let mut request = client.get(&endpoint);
    if let Some(ref key) = config.reader_api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            SearchError::Timeout(format!("reader request for {url}"))
        } else {
            SearchError::Http(format!("reader request failed: {e}"))
        }
    })?;
    http::check_status(response.status(), "reader")?;

    let body = response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("reading reader body: {e}")))?;

    let text = body.trim();
    if text.is_empty() {
        return Err(SearchError::Parse("reader returned empty body".into()));
    }

    let text = if text.len() > config.max_chars {
        let mut end = config.max_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n\n[content truncated]", &text[..end])
    } else {
        text.to_owned()
    };
    let word_count = text.split_whitespace().count();

    tracing::debug!(words = word_count, "fetched page via reader");
    Ok(PageContent {
        url: url.to_owned(),
        title: String::new(),
        text,
        word_count,
    })
}

/// Fetch a page directly and extract content locally.
async fn fetch_direct(url: &str, config: &FetchConfig) -> Result<PageContent> {
    let client = http::build_client(config.timeout_seconds, config.user_agent.as_deref())?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SearchError::Timeout(format!("fetching {url}"))
        } else {
            SearchError::Http(format!("fetching {url}: {e}"))
        }
    })?;
    http::check_status(response.status(), "fetch")?;

    let html = response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("reading body of {url}: {e}")))?;

    let page = content::extract_content_with_limit(&html, url, config.max_chars)?;
    tracing::debug!(words = page.word_count, "fetched page directly");
    Ok(page)
}
