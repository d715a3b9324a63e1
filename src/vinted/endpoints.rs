//! API paths and the per-call request value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version prefix every API path lives under.
pub const API_BASE_PATH: &str = "/api/v2";

/// Catalog search endpoint.
pub const CATALOG_ITEMS: &str = "/api/v2/catalog/items";

/// Item collection; detail paths hang off this.
pub const ITEMS: &str = "/api/v2/items";

/// Which generation of the item detail endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemEndpoint {
    /// `/api/v2/items/{id}/details`
    #[default]
    Details,
    /// `/api/v2/items/{id}`
    Plain,
}

impl ItemEndpoint {
    /// Returns the detail path for an item id.
    pub fn path(&self, item_id: &str) -> String {
        let id = urlencoding::encode(item_id);
        match self {
            ItemEndpoint::Details => format!("{}/{}/details", ITEMS, id),
            ItemEndpoint::Plain => format!("{}/{}", ITEMS, id),
        }
    }
}

impl FromStr for ItemEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "details" => Ok(ItemEndpoint::Details),
            "plain" => Ok(ItemEndpoint::Plain),
            _ => Err(format!("Unknown item endpoint: {}. Use: details, plain", s)),
        }
    }
}

impl fmt::Display for ItemEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemEndpoint::Details => write!(f, "details"),
            ItemEndpoint::Plain => write!(f, "plain"),
        }
    }
}

/// Ordered query parameters with primitive values.
///
/// ```
/// use vinted_scraper::Params;
///
/// let params = Params::new().with("search_text", "games").with("per_page", 20);
/// assert_eq!(params.to_query_string(), "search_text=games&per_page=20");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns the value of the first parameter named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Percent-encodes the parameters as `k=v&k=v`.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// One logical API call: a path under the API prefix plus optional query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    path: String,
    params: Option<Params>,
}

impl ApiRequest {
    /// Builds a request, prefixing `/api/v2` when the path lacks it.
    pub fn new(endpoint: &str, params: Option<&Params>) -> Self {
        let path = if endpoint.starts_with(API_BASE_PATH) {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", API_BASE_PATH, endpoint)
        } else {
            format!("{}/{}", API_BASE_PATH, endpoint)
        };

        Self { path, params: params.filter(|p| !p.is_empty()).cloned() }
    }

    /// Path including the API prefix, used in errors and logs.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Full URL against an origin such as `https://www.vinted.com`.
    pub fn url(&self, origin: &str) -> String {
        let origin = origin.trim_end_matches('/');
        match &self.params {
            Some(params) => format!("{}{}?{}", origin, self.path, params.to_query_string()),
            None => format!("{}{}", origin, self.path),
        }
    }
}
