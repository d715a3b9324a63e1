//! Client configuration with TOML, environment variables, and CLI overrides.

use crate::error::{Error, Result as ClientResult};
use crate::vinted::endpoints::ItemEndpoint;
use crate::vinted::headers::{is_valid_base_url, origin_from_base_url};
use crate::vinted::session::{DEFAULT_RETRIES, SESSION_COOKIE_NAME};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Settings fixed at client construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Vinted domain, e.g. `https://www.vinted.com` or `vinted.fr`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent; a random desktop one is used when unset
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Pre-supplied session cookies; skips the bootstrap request
    #[serde(default)]
    pub session_cookie: Option<BTreeMap<String, String>>,

    /// Cookie names accepted as a session credential
    #[serde(default = "default_cookie_names")]
    pub cookie_names: Vec<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whether to follow redirects
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Redirect hop limit when following
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Attempts per session bootstrap
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Backoff unit in milliseconds between bootstrap attempts
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Credential refreshes allowed per call after 401 responses
    #[serde(default = "default_max_refreshes")]
    pub max_refreshes: u32,

    /// Item detail endpoint generation
    #[serde(default)]
    pub item_endpoint: ItemEndpoint,
}

fn default_base_url() -> String {
    "https://www.vinted.com".to_string()
}

fn default_cookie_names() -> Vec<String> {
    vec![SESSION_COOKIE_NAME.to_string()]
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_refreshes() -> u32 {
    3
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: None,
            session_cookie: None,
            cookie_names: default_cookie_names(),
            proxy: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            max_refreshes: default_max_refreshes(),
            item_endpoint: ItemEndpoint::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a default configuration for the given domain.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("vinted.toml");
        if local_config.exists() {
            debug!("Found vinted.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("vinted-scraper").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("VINTED_BASE_URL") {
            self.base_url = base_url;
        }

        if let Ok(proxy) = std::env::var("VINTED_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(user_agent) = std::env::var("VINTED_USER_AGENT") {
            self.user_agent = Some(user_agent);
        }

        if let Ok(timeout) = std::env::var("VINTED_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        self
    }

    /// Checks the settings that would otherwise fail at request time.
    pub fn validate(&self) -> ClientResult<()> {
        if !is_valid_base_url(&self.base_url) {
            return Err(Error::invalid_url(&self.base_url));
        }
        if self.cookie_names.is_empty() {
            return Err(Error::InvalidConfiguration(
                "cookie_names must name at least one session cookie".to_string(),
            ));
        }
        Ok(())
    }

    /// Origin with scheme, derived from `base_url`.
    pub fn origin(&self) -> String {
        origin_from_base_url(&self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}
