//! URL normalisation: the identity used for result deduplication.
//!
//! Two URLs that differ only in scheme/host capitalisation, default
//! ports, a trailing slash, query-parameter order, tracking parameters,
//! or a fragment refer to the same page and must normalise to the same
//! string. Near-duplicate *content* under distinct URLs is out of scope:
//! identity is the URL alone.

use url::Url;

/// Tracking query parameters stripped during normalisation. Covers the
/// UTM family plus the click identifiers of the major ad networks
/// (Facebook, Google, Yandex, Microsoft).
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "yclid",
    "msclkid",
    "ref",
    "si",
    "feature",
];

/// Normalise a URL for deduplication comparison.
///
/// Transformations, in order:
///
/// 1. Drop the fragment.
/// 2. Drop default ports (`:80` for http, `:443` for https).
/// 3. Drop tracking parameters; sort the survivors by key then value.
/// 4. Drop a trailing path slash (unless the path is exactly `"/"`).
///
/// `Url::parse` lowercases the scheme and host, so the serialised form
/// is case-canonical. Unparseable input is returned unchanged — such
/// strings still deduplicate against byte-identical copies of themselves.
///
/// # Examples
///
/// ```
/// use scry_search::orchestrator::url_normalize::normalize_url;
///
/// let a = normalize_url("https://Example.COM/path/?b=2&a=1#section");
/// let b = normalize_url("https://example.com/path?a=1&b=2");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if is_default_port(&parsed) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&params)
            .finish();
        parsed.set_query(Some(&qs));
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(&path[..path.len() - 1]);
    }

    parsed.to_string()
}

/// Returns `true` if the URL uses the default port for its scheme.
fn is_default_port(url: &Url) -> bool {
    matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    )
}
