//! Typed layer: the same endpoints as [`VintedApi`], returning [`Item`]s.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::vinted::client::{VintedApi, VintedClient};
use crate::vinted::endpoints::{Params, CATALOG_ITEMS};
use crate::vinted::models::Item;
use serde_json::Value;
use tracing::debug;

/// Projects a search body (`{"items": [...]}`) into items.
pub fn project_items(endpoint: &str, body: &Value) -> Result<Vec<Item>> {
    let items = body.get("items").and_then(Value::as_array).ok_or_else(|| {
        Error::InvalidResponse {
            endpoint: endpoint.to_string(),
            detail: "missing \"items\" array".to_string(),
        }
    })?;

    debug!("Projecting {} items from {}", items.len(), endpoint);
    Ok(items.iter().map(Item::from).collect())
}

/// Projects an item detail body (`{"item": {...}}`).
pub fn project_item(endpoint: &str, body: &Value) -> Result<Item> {
    body.get("item").filter(|v| v.is_object()).map(Item::from).ok_or_else(|| {
        Error::InvalidResponse {
            endpoint: endpoint.to_string(),
            detail: "missing \"item\" object".to_string(),
        }
    })
}

/// Wraps a raw API client and converts its responses into typed records.
pub struct VintedScraper<A = VintedClient> {
    api: A,
}

impl VintedScraper<VintedClient> {
    /// Creates a scraper over a freshly bootstrapped [`VintedClient`].
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::from_api(VintedClient::new(config).await?))
    }

    /// Like [`VintedClient::with_origin`] (for testing).
    pub async fn with_origin(config: &ClientConfig, origin: Option<String>) -> Result<Self> {
        Ok(Self::from_api(VintedClient::with_origin(config, origin).await?))
    }
}

impl<A: VintedApi> VintedScraper<A> {
    pub fn from_api(api: A) -> Self {
        Self { api }
    }

    /// The wrapped raw client.
    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn into_inner(self) -> A {
        self.api
    }

    /// Searches the catalog and returns the listed items.
    pub async fn search(&self, params: Option<&Params>) -> Result<Vec<Item>> {
        let body = self.api.search(params).await?;
        project_items(CATALOG_ITEMS, &body)
    }

    /// Fetches one item with its seller details.
    pub async fn item(&self, item_id: &str, params: Option<&Params>) -> Result<Item> {
        let body = self.api.item(item_id, params).await?;
        project_item(&self.api.item_path(item_id), &body)
    }

    /// Raw passthrough for endpoints without a typed record.
    pub async fn call(&self, endpoint: &str, params: Option<&Params>) -> Result<Value> {
        self.api.call(endpoint, params).await
    }
}
