//! Shared HTTP client construction with User-Agent rotation.
//!
//! Builds [`reqwest::Client`] instances with browser-like headers, cookie
//! support, and rotating User-Agent strings so that repeated automated
//! requests look like ordinary browser traffic.

use crate::error::SearchError;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:134.0) Gecko/20100101 Firefox/134.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:134.0) Gecko/20100101 Firefox/134.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:134.0) Gecko/20100101 Firefox/134.0",
];

/// Build a [`reqwest::Client`] for engine or page requests.
///
/// The client has a cookie store (consent pages), the given timeout, a
/// random User-Agent from the rotation list (or the custom one when
/// provided), and a redirect cap of 10 hops.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(
    timeout_seconds: u64,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, SearchError> {
    let ua = match user_agent {
        Some(custom) => custom.to_owned(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is a non-empty const array; choose only fails on empty slices
        .unwrap_or(USER_AGENTS[0])
}

/// Map an HTTP response status to a [`SearchError`], distinguishing
/// auth rejections and rate limiting from generic failures.
///
/// Returns `Ok(())` for success statuses.
pub fn check_status(status: reqwest::StatusCode, provider: &str) -> Result<(), SearchError> {
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        401 | 403 => Err(SearchError::Auth(format!("{provider} returned {status}"))),
        429 => Err(SearchError::RateLimited(format!(
            "{provider} returned 429"
        ))),
        _ => Err(SearchError::Http(format!("{provider} returned {status}"))),
    }
}
