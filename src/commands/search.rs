//! Catalog search command implementation.

use crate::config::ClientConfig;
use crate::vinted::endpoints::{Params, CATALOG_ITEMS};
use crate::vinted::scraper::project_items;
use crate::vinted::{VintedApi, VintedClient};
use anyhow::{Context, Result};
use tracing::info;

/// Search filters passed through as query parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub order: Option<String>,
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
    /// Print the raw response instead of typed items
    pub raw: bool,
}

impl SearchOptions {
    /// Builds the query for `search_text` plus any set filter.
    pub fn to_params(&self, query: &str) -> Params {
        let mut params = Params::new().with("search_text", query);
        if let Some(page) = self.page {
            params.insert("page", page);
        }
        if let Some(per_page) = self.per_page {
            params.insert("per_page", per_page);
        }
        if let Some(order) = &self.order {
            params.insert("order", order);
        }
        if let Some(price_from) = self.price_from {
            params.insert("price_from", price_from);
        }
        if let Some(price_to) = self.price_to {
            params.insert("price_to", price_to);
        }
        params
    }
}

/// Executes a catalog search.
pub struct SearchCommand {
    config: ClientConfig,
    options: SearchOptions,
}

impl SearchCommand {
    pub fn new(config: ClientConfig, options: SearchOptions) -> Self {
        Self { config, options }
    }

    /// Executes the search and returns pretty JSON.
    pub async fn execute(&self, query: &str) -> Result<String> {
        let client =
            VintedClient::new(&self.config).await.context("Failed to create Vinted client")?;

        self.execute_with_client(&client, query).await
    }

    /// Executes the search with a provided client (for testing).
    pub async fn execute_with_client(&self, client: &impl VintedApi, query: &str) -> Result<String> {
        info!("Searching for: {}", query);

        let params = self.options.to_params(query);
        let body = client.search(Some(&params)).await?;

        if self.options.raw {
            return Ok(serde_json::to_string_pretty(&body)?);
        }

        let items = project_items(CATALOG_ITEMS, &body)?;
        info!("Found {} items", items.len());
        Ok(serde_json::to_string_pretty(&items)?)
    }
}
