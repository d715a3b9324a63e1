//! Browser-like header sets and base URL validation.

use crate::vinted::session::Credential;
use regex_lite::Regex;
use std::sync::LazyLock;

/// Accept value for the HTML bootstrap request.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept value for JSON API calls.
pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";

static BASE_URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(https?://)?(www\.)?[\w.-]+\.\w{2,}$").ok());

/// Returns true if `url` is a bare origin: optional scheme, optional `www.`,
/// a dotted hostname, and nothing else (no port, path or query).
pub fn is_valid_base_url(url: &str) -> bool {
    BASE_URL_PATTERN.as_ref().is_some_and(|re| re.is_match(url))
}

/// Turns a validated base URL into an origin with a scheme.
pub fn origin_from_base_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn browser_headers(origin: &str, user_agent: &str, accept: &str) -> Vec<(&'static str, String)> {
    vec![
        ("User-Agent", user_agent.to_string()),
        ("Accept", accept.to_string()),
        ("Accept-Encoding", "gzip, deflate, br".to_string()),
        ("Accept-Language", "en-US,en;q=0.5".to_string()),
        ("Connection", "keep-alive".to_string()),
        ("Upgrade-Insecure-Requests", "1".to_string()),
        ("DNT", "1".to_string()),
        ("Sec-Fetch-Dest", "document".to_string()),
        ("Sec-Fetch-Mode", "navigate".to_string()),
        ("Sec-Fetch-Site", "none".to_string()),
        ("Sec-Fetch-User", "?1".to_string()),
        ("Origin", origin.to_string()),
        ("Referer", origin.to_string()),
    ]
}

/// Headers for the unauthenticated request to the site root.
pub fn bootstrap_headers(origin: &str, user_agent: &str) -> Vec<(&'static str, String)> {
    browser_headers(origin, user_agent, ACCEPT_HTML)
}

/// Headers for an API call, carrying the credential as a `Cookie` header.
pub fn api_headers(
    origin: &str,
    user_agent: &str,
    credential: &Credential,
) -> Vec<(&'static str, String)> {
    let mut headers = browser_headers(origin, user_agent, ACCEPT_JSON);
    headers.push(("Cookie", credential.cookie_header()));
    headers
}
