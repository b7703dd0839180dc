//! Configuration types for the research pipeline.
//!
//! Configuration is layered: built-in defaults, then an optional TOML
//! file at [`crate::scry_dirs::config_file`], then `SCRY_*` environment
//! variables. Environment always wins, so a CI job or one-off run can
//! override a checked-in config without editing it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, ScryError};

/// Top-level configuration for a research run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScryConfig {
    /// Generation provider settings (OpenAI-compatible API).
    pub llm: LlmConfig,
    /// Web search settings (SearXNG instance + DuckDuckGo fallback).
    pub search: SearchSection,
    /// Page retrieval settings (direct fetch or reader proxy).
    pub reader: ReaderConfig,
    /// On-disk research cache settings.
    pub cache: CacheConfig,
    /// Stage concurrency, planning caps, and selection size.
    pub pipeline: PipelineConfig,
    /// Log output settings.
    pub log: LogConfig,
}

/// Generation provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key sent as a Bearer token. Usually supplied via
    /// `SCRY_LLM_API_KEY` rather than the config file.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible endpoint, without the
    /// `/chat/completions` suffix.
    pub base_url: String,
    /// Model name to request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate per response.
    pub max_tokens: usize,
    /// Sustained request rate towards the provider, in requests per
    /// second. The request gate spaces calls to honour this.
    pub requests_per_second: f64,
    /// Per-call timeout in seconds. Generation calls are slow; the
    /// default allows long syntheses to finish.
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.3,
            max_tokens: 4096,
            requests_per_second: 1.0,
            timeout_seconds: 120,
        }
    }
}

/// Web search configuration.
///
/// Named `SearchSection` to avoid shadowing the member crate's
/// [`scry_search::SearchConfig`], which this section is converted into
/// per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Base URL of the SearXNG instance. When unset, only DuckDuckGo is
    /// queried.
    pub base_url: Option<String>,
    /// HTTP Basic auth username for the SearXNG instance.
    pub user: Option<String>,
    /// HTTP Basic auth password for the SearXNG instance.
    pub password: Option<String>,
    /// Sustained request rate towards search providers, in requests per
    /// minute.
    pub requests_per_minute: u32,
    /// Per-query timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum results to keep per query.
    pub max_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            base_url: None,
            user: None,
            password: None,
            requests_per_minute: 30,
            timeout_seconds: 10,
            max_results: 5,
        }
    }
}

/// Page retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Reader-proxy base URL. When set, documents are fetched through it
    /// as pre-extracted text; when unset, pages are fetched directly and
    /// cleaned locally.
    pub base_url: Option<String>,
    /// Bearer token for the reader proxy.
    pub api_key: Option<String>,
    /// Sustained request rate towards the fetch target, in requests per
    /// second.
    pub requests_per_second: f64,
    /// Per-fetch timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            requests_per_second: 1.0,
            timeout_seconds: 15,
        }
    }
}

/// On-disk research cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory. `None` resolves to
    /// [`crate::scry_dirs::cache_dir`].
    pub root: Option<PathBuf>,
    /// Entries older than this many days are treated as absent on read.
    pub max_age_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_age_days: 30,
        }
    }
}

/// Stage concurrency, planning caps, and selection sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum sub-queries derived from the topic.
    pub max_subqueries: usize,
    /// Maximum search queries generated per language per sub-query.
    pub max_queries_per_language: usize,
    /// Languages to generate search queries in.
    pub languages: Vec<String>,
    /// How many ranked results/summaries survive each selection step.
    pub top_results: usize,
    /// Concurrent search queries in flight.
    pub search_concurrency: usize,
    /// Concurrent document fetches in flight.
    pub fetch_concurrency: usize,
    /// Concurrent summarisation calls in flight.
    pub summarize_concurrency: usize,
    /// Concurrent ranking calls in flight.
    pub rank_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_subqueries: 3,
            max_queries_per_language: 3,
            languages: vec!["en".to_owned(), "ru".to_owned()],
            top_results: 5,
            search_concurrency: 4,
            fetch_concurrency: 3,
            summarize_concurrency: 2,
            rank_concurrency: 2,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for daily-rotated log files. `None` resolves to
    /// [`crate::scry_dirs::logs_dir`].
    pub dir: Option<PathBuf>,
}

impl ScryConfig {
    /// Load configuration: file (if present) under env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed. A missing file is not an error.
    pub fn load() -> Result<Self> {
        let path = crate::scry_dirs::config_file();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScryError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| ScryError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config
    /// cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScryError::Config(format!("creating {}: {e}", parent.display())))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScryError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ScryError::Config(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    /// Overlay `SCRY_*` environment variables onto this config.
    ///
    /// Unset and empty variables leave the existing value in place.
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_string("SCRY_LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = env_string("SCRY_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = env_string("SCRY_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env_parsed::<f64>("SCRY_LLM_RPS") {
            self.llm.requests_per_second = v;
        }
        if let Some(v) = env_string("SCRY_SEARCH_BASE_URL") {
            self.search.base_url = Some(v);
        }
        if let Some(v) = env_string("SCRY_SEARCH_USER") {
            self.search.user = Some(v);
        }
        if let Some(v) = env_string("SCRY_SEARCH_PASSWORD") {
            self.search.password = Some(v);
        }
        if let Some(v) = env_parsed::<u32>("SCRY_SEARCH_RPM") {
            self.search.requests_per_minute = v;
        }
        if let Some(v) = env_string("SCRY_READER_BASE_URL") {
            self.reader.base_url = Some(v);
        }
        if let Some(v) = env_string("SCRY_READER_API_KEY") {
            self.reader.api_key = Some(v);
        }
        if let Some(v) = env_parsed::<f64>("SCRY_READER_RPS") {
            self.reader.requests_per_second = v;
        }
        if let Some(v) = env_string("SCRY_CACHE_ROOT") {
            self.cache.root = Some(PathBuf::from(v));
        }
        if let Some(v) = env_parsed::<u64>("SCRY_CACHE_MAX_AGE_DAYS") {
            self.cache.max_age_days = v;
        }
        if let Some(v) = env_string("SCRY_LOG_DIR") {
            self.log.dir = Some(PathBuf::from(v));
        }
    }

    /// Validates this configuration, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Config`] describing the invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(ScryError::Config(
                "llm.api_key is empty (set SCRY_LLM_API_KEY)".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ScryError::Config("llm.model is empty".into()));
        }
        if url::Url::parse(&self.llm.base_url).is_err() {
            return Err(ScryError::Config(format!(
                "llm.base_url is not a valid URL: {}",
                self.llm.base_url
            )));
        }
        if self.llm.requests_per_second <= 0.0 || !self.llm.requests_per_second.is_finite() {
            return Err(ScryError::Config(
                "llm.requests_per_second must be positive and finite".into(),
            ));
        }
        if self.search.requests_per_minute == 0 {
            return Err(ScryError::Config(
                "search.requests_per_minute must be greater than 0".into(),
            ));
        }
        if let Some(ref base) = self.search.base_url {
            if url::Url::parse(base).is_err() {
                return Err(ScryError::Config(format!(
                    "search.base_url is not a valid URL: {base}"
                )));
            }
        }
        if self.reader.requests_per_second <= 0.0 || !self.reader.requests_per_second.is_finite() {
            return Err(ScryError::Config(
                "reader.requests_per_second must be positive and finite".into(),
            ));
        }
        if let Some(ref base) = self.reader.base_url {
            if url::Url::parse(base).is_err() {
                return Err(ScryError::Config(format!(
                    "reader.base_url is not a valid URL: {base}"
                )));
            }
        }
        if self.cache.max_age_days == 0 {
            return Err(ScryError::Config(
                "cache.max_age_days must be greater than 0".into(),
            ));
        }
        if self.pipeline.max_subqueries == 0 {
            return Err(ScryError::Config(
                "pipeline.max_subqueries must be greater than 0".into(),
            ));
        }
        if self.pipeline.max_queries_per_language == 0 {
            return Err(ScryError::Config(
                "pipeline.max_queries_per_language must be greater than 0".into(),
            ));
        }
        if self.pipeline.languages.is_empty() {
            return Err(ScryError::Config(
                "pipeline.languages must not be empty".into(),
            ));
        }
        if self.pipeline.top_results == 0 {
            return Err(ScryError::Config(
                "pipeline.top_results must be greater than 0".into(),
            ));
        }
        for (name, value) in [
            ("search_concurrency", self.pipeline.search_concurrency),
            ("fetch_concurrency", self.pipeline.fetch_concurrency),
            ("summarize_concurrency", self.pipeline.summarize_concurrency),
            ("rank_concurrency", self.pipeline.rank_concurrency),
        ] {
            if value == 0 {
                return Err(ScryError::Config(format!(
                    "pipeline.{name} must be greater than 0"
                )));
            }
        }
        Ok(())
    }

    /// Build the member-crate search config for one query in the given
    /// language.
    ///
    /// A configured SearXNG instance already aggregates many upstream
    /// indexes, so it is queried alone; DuckDuckGo is the
    /// zero-configuration fallback when no instance is set.
    pub fn search_config(&self, language: Option<&str>) -> scry_search::SearchConfig {
        let engines = if self.search.base_url.is_some() {
            vec![scry_search::SearchEngine::Searxng]
        } else {
            vec![scry_search::SearchEngine::DuckDuckGo]
        };
        scry_search::SearchConfig {
            engines,
            max_results: self.search.max_results,
            timeout_seconds: self.search.timeout_seconds,
            language: language.map(str::to_owned),
            searxng_base_url: self.search.base_url.clone(),
            searxng_user: self.search.user.clone(),
            searxng_password: self.search.password.clone(),
            // The request gate already spaces queries.
            request_delay_ms: (0, 0),
            ..Default::default()
        }
    }

    /// Build the member-crate fetch config.
    pub fn fetch_config(&self) -> scry_search::FetchConfig {
        scry_search::FetchConfig {
            timeout_seconds: self.reader.timeout_seconds,
            reader_base_url: self.reader.base_url.clone(),
            reader_api_key: self.reader.api_key.clone(),
            ..Default::default()
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(%key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}
