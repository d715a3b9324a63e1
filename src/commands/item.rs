//! Item lookup command implementation.

use crate::config::ClientConfig;
use crate::vinted::models::Item;
use crate::vinted::scraper::project_item;
use crate::vinted::{VintedApi, VintedClient};
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

fn is_valid_item_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// Executes an item lookup by id.
pub struct ItemCommand {
    config: ClientConfig,
    raw: bool,
}

impl ItemCommand {
    pub fn new(config: ClientConfig, raw: bool) -> Self {
        Self { config, raw }
    }

    /// Fetches an item and returns pretty JSON.
    pub async fn execute(&self, id: &str) -> Result<String> {
        let client =
            VintedClient::new(&self.config).await.context("Failed to create Vinted client")?;

        self.execute_with_client(&client, id).await
    }

    /// Fetches an item with a provided client (for testing).
    pub async fn execute_with_client(&self, client: &impl VintedApi, id: &str) -> Result<String> {
        let id = id.trim();
        if !is_valid_item_id(id) {
            anyhow::bail!("Invalid item id: '{}'. Item ids are numeric.", id);
        }

        info!("Looking up item: {}", id);
        let body = client.item(id, None).await?;

        if self.raw {
            return Ok(serde_json::to_string_pretty(&body)?);
        }

        let item = project_item(&client.item_path(id), &body)?;
        Ok(serde_json::to_string_pretty(&item)?)
    }

    /// Fetches several items, skipping ones that fail.
    pub async fn execute_batch(&self, ids: &[String]) -> Result<String> {
        let client =
            VintedClient::new(&self.config).await.context("Failed to create Vinted client")?;

        self.execute_batch_with_client(&client, ids).await
    }

    /// Fetches several items with a provided client (for testing).
    pub async fn execute_batch_with_client(
        &self,
        client: &impl VintedApi,
        ids: &[String],
    ) -> Result<String> {
        let mut items: Vec<Item> = Vec::new();
        let mut raw_bodies: Vec<Value> = Vec::new();

        for id in ids {
            let id = id.trim();
            if !is_valid_item_id(id) {
                eprintln!("Skipping invalid item id: {}", id);
                continue;
            }

            info!("Looking up item: {}", id);

            match client.item(id, None).await {
                Ok(body) if self.raw => raw_bodies.push(body),
                Ok(body) => match project_item(&client.item_path(id), &body) {
                    Ok(item) => items.push(item),
                    Err(e) => eprintln!("Failed to read item {}: {}", id, e),
                },
                Err(e) => eprintln!("Failed to fetch item {}: {}", id, e),
            }
        }

        if self.raw {
            Ok(serde_json::to_string_pretty(&raw_bodies)?)
        } else {
            Ok(serde_json::to_string_pretty(&items)?)
        }
    }
}
