//! In-memory memo for search round results.
//!
//! Remembers the final deduplicated, scored, sorted result list for a
//! short window so that repeated identical queries within one research
//! run (or across quick successive runs) skip the network entirely.
//! Built on [`moka`] for async-friendly caching with TTL and automatic
//! eviction.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::time::Duration;

use moka::future::Cache;

use crate::config::SearchConfig;
use crate::types::SearchResult;

/// Maximum number of memoised result sets held at once.
const MAX_MEMO_ENTRIES: u64 = 100;

/// Process-wide memo, lazily initialised on first access. The TTL is
/// fixed when first created and later calls reuse it unchanged.
static MEMO: OnceLock<Cache<MemoKey, Vec<SearchResult>>> = OnceLock::new();

/// Composite memo key covering every input that can change the result
/// list: the normalised query plus a fingerprint of the engine set,
/// language, safe-search flag and result cap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    /// Lowercased, trimmed query string.
    query: String,
    /// Fingerprint of the result-affecting parts of the config.
    config_fingerprint: u64,
}

impl MemoKey {
    /// Build a deterministic key from a query and the search config it
    /// will run under.
    ///
    /// The query is lowercased and trimmed. The engine list is sorted
    /// before fingerprinting so engine order in the config does not
    /// split the memo.
    pub fn new(query: &str, config: &SearchConfig) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            config_fingerprint: fingerprint_config(config),
        }
    }
}

fn get_or_init_memo(ttl_seconds: u64) -> &'static Cache<MemoKey, Vec<SearchResult>> {
    MEMO.get_or_init(|| {
        Cache::builder()
            .max_capacity(MAX_MEMO_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build()
    })
}

/// Look up memoised results for the given key.
///
/// Returns `Some(results)` on a hit, `None` on a miss.
pub async fn get(key: &MemoKey, ttl_seconds: u64) -> Option<Vec<SearchResult>> {
    get_or_init_memo(ttl_seconds).get(key).await
}

/// Store a finished result list under the given key.
pub async fn insert(key: MemoKey, results: Vec<SearchResult>, ttl_seconds: u64) {
    get_or_init_memo(ttl_seconds).insert(key, results).await;
}

/// Hash the parts of a [`SearchConfig`] that affect the result list.
fn fingerprint_config(config: &SearchConfig) -> u64 {
    let mut names: Vec<&str> = config.engines.iter().map(|e| e.name()).collect();
    names.sort_unstable();

    let mut hasher = DefaultHasher::new();
    for name in names {
        name.hash(&mut hasher);
    }
    config.language.hash(&mut hasher);
    config.safe_search.hash(&mut hasher);
    config.max_results.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchEngine;

    fn config_with(engines: Vec<SearchEngine>) -> SearchConfig {
        SearchConfig {
            engines,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn memo_key_deterministic_for_same_inputs() {
        let config = config_with(vec![SearchEngine::Searxng, SearchEngine::DuckDuckGo]);
        let key1 = MemoKey::new("rust async runtimes", &config);
        let key2 = MemoKey::new("rust async runtimes", &config);
        assert_eq!(key1, key2);
    }

    #[test]
    fn memo_key_differs_when_query_differs() {
        let config = config_with(vec![SearchEngine::Searxng]);
        let key1 = MemoKey::new("rust", &config);
        let key2 = MemoKey::new("python", &config);
        assert_ne!(key1, key2);
    }

    #[test]
    fn memo_key_differs_when_engine_set_differs() {
        let key1 = MemoKey::new("test", &config_with(vec![SearchEngine::Searxng]));
        let key2 = MemoKey::new("test", &config_with(vec![SearchEngine::DuckDuckGo]));
        assert_ne!(key1, key2);
    }

    #[test]
    fn memo_key_same_for_reordered_engines() {
        let key1 = MemoKey::new(
            "test",
            &config_with(vec![SearchEngine::Searxng, SearchEngine::DuckDuckGo]),
        );
        let key2 = MemoKey::new(
            "test",
            &config_with(vec![SearchEngine::DuckDuckGo, SearchEngine::Searxng]),
        );
        assert_eq!(key1, key2);
    }

    #[test]
    fn memo_key_differs_when_language_differs() {
        let mut config_en = config_with(vec![SearchEngine::Searxng]);
        config_en.language = Some("en".into());
        let mut config_ru = config_with(vec![SearchEngine::Searxng]);
        config_ru.language = Some("ru".into());

        let key_en = MemoKey::new("test", &config_en);
        let key_ru = MemoKey::new("test", &config_ru);
        assert_ne!(key_en, key_ru);
    }

    #[test]
    fn memo_key_differs_when_max_results_differs() {
        let mut config_small = config_with(vec![SearchEngine::Searxng]);
        config_small.max_results = 5;
        let mut config_large = config_with(vec![SearchEngine::Searxng]);
        config_large.max_results = 20;

        let key_small = MemoKey::new("test", &config_small);
        let key_large = MemoKey::new("test", &config_large);
        assert_ne!(key_small, key_large);
    }

    #[test]
    fn memo_key_normalises_query_case_and_whitespace() {
        let config = config_with(vec![SearchEngine::Searxng]);
        let key1 = MemoKey::new("  RUST Programming  ", &config);
        let key2 = MemoKey::new("rust programming", &config);
        assert_eq!(key1, key2);
    }

    #[tokio::test]
    async fn memo_miss_returns_none() {
        let config = config_with(vec![SearchEngine::DuckDuckGo]);
        let key = MemoKey::new("memo_test_miss_q1x9z", &config);
        assert!(get(&key, 600).await.is_none());
    }

    #[tokio::test]
    async fn memo_insert_and_retrieve() {
        let config = config_with(vec![SearchEngine::Searxng]);
        let key = MemoKey::new("memo_test_insert_retrieve", &config);
        let results = vec![SearchResult {
            title: "Remembered".into(),
            url: "https://memo.example.com".into(),
            snippet: "a memoised result".into(),
            engine: "SearXNG".into(),
            score: 1.2,
        }];

        insert(key.clone(), results.clone(), 600).await;

        let hit = get(&key, 600).await;
        assert!(hit.is_some());
        let hit = hit.expect("should be memoised");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].title, "Remembered");
    }

    #[tokio::test]
    async fn distinct_queries_memoised_independently() {
        let config = config_with(vec![SearchEngine::Searxng]);
        let key_a = MemoKey::new("memo_test_independent_a", &config);
        let key_b = MemoKey::new("memo_test_independent_b", &config);

        let results_a = vec![SearchResult {
            title: "Result A".into(),
            url: "https://a.example.com".into(),
            snippet: "snippet a".into(),
            engine: "SearXNG".into(),
            score: 1.0,
        }];
        let results_b = vec![SearchResult {
            title: "Result B".into(),
            url: "https://b.example.com".into(),
            snippet: "snippet b".into(),
            engine: "SearXNG".into(),
            score: 2.0,
        }];

        insert(key_a.clone(), results_a, 600).await;
        insert(key_b.clone(), results_b, 600).await;

        let hit_a = get(&key_a, 600).await.expect("a should be memoised");
        let hit_b = get(&key_b, 600).await.expect("b should be memoised");
        assert_eq!(hit_a[0].title, "Result A");
        assert_eq!(hit_b[0].title, "Result B");
    }

    #[tokio::test]
    async fn overwrite_same_key_updates_value() {
        let config = config_with(vec![SearchEngine::DuckDuckGo]);
        let key = MemoKey::new("memo_test_overwrite", &config);

        let old = vec![SearchResult {
            title: "Old".into(),
            url: "https://old.example.com".into(),
            snippet: "old".into(),
            engine: "DuckDuckGo".into(),
            score: 1.0,
        }];
        let new = vec![SearchResult {
            title: "New".into(),
            url: "https://new.example.com".into(),
            snippet: "new".into(),
            engine: "DuckDuckGo".into(),
            score: 2.0,
        }];

        insert(key.clone(), old, 600).await;
        insert(key.clone(), new, 600).await;

        let hit = get(&key, 600).await.expect("should be memoised");
        assert_eq!(hit[0].title, "New");
    }

    #[test]
    fn fingerprint_empty_engine_list_deterministic() {
        let config = config_with(vec![]);
        assert_eq!(fingerprint_config(&config), fingerprint_config(&config));
    }
}
