//! Session bootstrap: turns an unauthenticated hit on the site root into
//! the cookie credential the JSON API accepts.
//!
//! Acquisition is bounded. Each failed attempt (non-200, no named cookie in
//! the response, or a transport failure) is followed by an exponential wait
//! of `backoff_base * 2^attempt` before the next one. No wait follows the
//! last attempt.

use crate::error::{Error, Result};
use crate::vinted::headers::bootstrap_headers;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use wreq::cookie::Cookie;
use wreq::Client;

/// Cookie the API treats as the session token.
pub const SESSION_COOKIE_NAME: &str = "access_token_web";

/// Default number of bootstrap attempts.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default backoff unit; attempt `i` waits `unit * 2^i` after failing.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Cookie names and values that authenticate an API call.
///
/// Values are never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential {
    cookies: BTreeMap<String, String>,
}

impl Credential {
    pub fn new(cookies: BTreeMap<String, String>) -> Self {
        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Cookie names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(String::as_str)
    }

    /// Serializes as a `Cookie` header value: `a=1; b=2`.
    pub fn cookie_header(&self) -> String {
        self.cookies.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("; ")
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.cookies
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("names", &self.cookies.keys().collect::<Vec<_>>()).finish()
    }
}

impl From<BTreeMap<String, String>> for Credential {
    fn from(cookies: BTreeMap<String, String>) -> Self {
        Self::new(cookies)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credential {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Waits between bootstrap attempts. Swappable so tests can observe delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Whether a cookie still counts, given its `Max-Age` and `Expires` attributes.
/// `Max-Age` wins when both are present; a negative one parses as zero.
fn is_live(max_age: Option<Duration>, expires: Option<SystemTime>, now: SystemTime) -> bool {
    match (max_age, expires) {
        (Some(max_age), _) => !max_age.is_zero(),
        (None, Some(expires)) => expires > now,
        (None, None) => true,
    }
}

/// Collects the wanted cookies from a response's parsed `Set-Cookie` headers.
///
/// Empty values and cookies the server is deleting (zero `Max-Age`, past
/// `Expires`) are skipped. A later header for the same name wins.
pub fn extract_cookies<'a>(
    cookies: impl IntoIterator<Item = Cookie<'a>>,
    cookie_names: &[String],
) -> Credential {
    let now = SystemTime::now();
    let mut jar = BTreeMap::new();
    for cookie in cookies {
        if !cookie_names.iter().any(|wanted| wanted == cookie.name()) {
            continue;
        }

        let value = cookie.value().trim_matches('"');
        if value.is_empty() || !is_live(cookie.max_age(), cookie.expires(), now) {
            debug!("Skipping expired or empty cookie {}", cookie.name());
            jar.remove(cookie.name());
            continue;
        }

        jar.insert(cookie.name().to_string(), value.to_string());
    }
    Credential::new(jar)
}

/// Obtains and refreshes the session credential.
#[derive(Clone)]
pub struct SessionManager {
    http: Client,
    origin: String,
    user_agent: String,
    cookie_names: Vec<String>,
    backoff_base: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl SessionManager {
    /// Creates a manager for `origin` (scheme included, no trailing path).
    pub fn new(
        http: Client,
        origin: impl Into<String>,
        user_agent: impl Into<String>,
        cookie_names: Vec<String>,
    ) -> Self {
        Self {
            http,
            origin: origin.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            cookie_names,
            backoff_base: DEFAULT_BACKOFF_BASE,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Sets the backoff unit.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Replaces the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn cookie_names(&self) -> &[String] {
        &self.cookie_names
    }

    /// Delay after failed attempt `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Fetches a fresh credential, trying at most `max_attempts` times.
    ///
    /// Returns as soon as one response carries at least one of the named
    /// cookies. Fails with [`Error::CredentialAcquisition`] carrying the last
    /// status seen, or `None` if no response ever arrived.
    pub async fn acquire(&self, max_attempts: u32) -> Result<Credential> {
        let url = format!("{}/", self.origin);
        let mut last_status = None;

        for attempt in 0..max_attempts {
            debug!("Cookie fetch attempt {}/{}", attempt + 1, max_attempts);

            match self.fetch_root(&url).await {
                Ok((status, credential)) => {
                    last_status = Some(status);
                    if status == 200 {
                        if !credential.is_empty() {
                            info!("Session cookie fetched: {:?}", credential);
                            return Ok(credential);
                        }
                        warn!("Cannot find session cookie in response");
                    } else {
                        warn!(
                            "Cookie fetch failed with status {} (attempt {}/{})",
                            status,
                            attempt + 1,
                            max_attempts
                        );
                    }
                }
                Err(e) => {
                    warn!("Cookie fetch request failed (attempt {}/{}): {}", attempt + 1, max_attempts, e);
                }
            }

            if attempt + 1 < max_attempts {
                let delay = self.backoff_delay(attempt);
                debug!("Sleeping for {:?}", delay);
                self.sleeper.sleep(delay).await;
            }
        }

        warn!("Cannot fetch session cookie from {}", self.origin);
        Err(Error::CredentialAcquisition { origin: self.origin.clone(), status: last_status })
    }

    async fn fetch_root(&self, url: &str) -> Result<(u16, Credential)> {
        debug!("GET {}", url);

        let mut request = self.http.get(url);
        for (name, value) in bootstrap_headers(&self.origin, &self.user_agent) {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        debug!("Response status: {}", status);

        let credential = extract_cookies(response.cookies(), &self.cookie_names);

        Ok((status, credential))
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("origin", &self.origin)
            .field("cookie_names", &self.cookie_names)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}
