//! Blocking wrappers around the async client.
//!
//! Each client owns a current-thread tokio runtime and drives the async
//! protocol on it, so bootstrap, refresh and retry behave exactly as in the
//! async client. The calling thread blocks at the same points the async
//! client awaits. Do not use these from inside an async runtime.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::vinted::client::{VintedApi, VintedClient as AsyncClient};
use crate::vinted::endpoints::{ItemEndpoint, Params, CATALOG_ITEMS};
use crate::vinted::models::Item;
use crate::vinted::scraper::{project_item, project_items};
use crate::vinted::session::{Credential, Sleeper};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Blocking raw-JSON client.
pub struct VintedClient {
    // Dropped before the runtime it was built on.
    inner: AsyncClient,
    runtime: Runtime,
}

impl VintedClient {
    /// Creates a client and bootstraps a session unless cookies are configured.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_origin(config, None)
    }

    /// Sends requests to `origin` instead of the configured domain (for testing).
    pub fn with_origin(config: &ClientConfig, origin: Option<String>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = runtime.block_on(AsyncClient::with_origin(config, origin))?;
        Ok(Self { inner, runtime })
    }

    /// Like [`VintedClient::with_origin`] with a custom bootstrap sleeper.
    pub fn with_sleeper(
        config: &ClientConfig,
        origin: Option<String>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = runtime.block_on(AsyncClient::with_sleeper(config, origin, sleeper))?;
        Ok(Self { inner, runtime })
    }

    pub fn origin(&self) -> &str {
        self.inner.origin()
    }

    pub fn item_endpoint(&self) -> ItemEndpoint {
        self.inner.item_endpoint()
    }

    pub fn credential(&self) -> Credential {
        self.runtime.block_on(self.inner.credential())
    }

    pub fn refresh_credential(&self) -> Result<Credential> {
        self.runtime.block_on(self.inner.refresh_credential())
    }

    pub fn call(&self, endpoint: &str, params: Option<&Params>) -> Result<Value> {
        self.runtime.block_on(self.inner.call(endpoint, params))
    }

    pub fn search(&self, params: Option<&Params>) -> Result<Value> {
        self.runtime.block_on(self.inner.search(params))
    }

    pub fn item(&self, item_id: &str, params: Option<&Params>) -> Result<Value> {
        self.runtime.block_on(self.inner.item(item_id, params))
    }

    /// Releases the connection pool and the runtime.
    pub fn close(self) {
        debug!("Closing blocking VintedClient for {}", self.inner.origin());
    }
}

/// Blocking typed client.
pub struct VintedScraper {
    client: VintedClient,
}

impl VintedScraper {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self { client: VintedClient::new(config)? })
    }

    pub fn with_origin(config: &ClientConfig, origin: Option<String>) -> Result<Self> {
        Ok(Self { client: VintedClient::with_origin(config, origin)? })
    }

    pub fn from_client(client: VintedClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &VintedClient {
        &self.client
    }

    pub fn search(&self, params: Option<&Params>) -> Result<Vec<Item>> {
        let body = self.client.search(params)?;
        project_items(CATALOG_ITEMS, &body)
    }

    pub fn item(&self, item_id: &str, params: Option<&Params>) -> Result<Item> {
        let body = self.client.item(item_id, params)?;
        project_item(&self.client.item_endpoint().path(item_id), &body)
    }

    pub fn call(&self, endpoint: &str, params: Option<&Params>) -> Result<Value> {
        self.client.call(endpoint, params)
    }

    pub fn close(self) {
        self.client.close();
    }
}
