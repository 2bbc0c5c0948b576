use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::cache::TtlCache;
use crate::domain::{ItemPrice, merge_listings};
use crate::market::MarketClient;

use super::AppError;

/// Cache key of the merged item list.
pub const ITEMS_CACHE_KEY: &str = "items";

pub const DEFAULT_ITEMS_TTL: Duration = Duration::from_secs(5 * 60);

/// Aggregates the tradable and untradable marketplace listings.
pub struct ItemService {
    client: Arc<dyn MarketClient>,
    cache: Arc<TtlCache<Vec<ItemPrice>>>,
    ttl: Duration,
}

impl ItemService {
    pub fn new(client: Arc<dyn MarketClient>, cache: Arc<TtlCache<Vec<ItemPrice>>>) -> Self {
        Self {
            client,
            cache,
            ttl: DEFAULT_ITEMS_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Merged price list, served from cache while fresh.
    pub async fn get_items(&self) -> Result<Vec<ItemPrice>, AppError> {
        if let Some(items) = self.cache.get(ITEMS_CACHE_KEY) {
            debug!(count = items.len(), "Serving items from cache");
            return Ok(items);
        }

        let tradable = self
            .client
            .get_items(&HashMap::new())
            .await
            .map_err(|err| {
                error!(error = %err, "Failed to fetch tradable items");
                AppError::Internal
            })?;

        let untradable_params = HashMap::from([("tradable".to_string(), "0".to_string())]);
        let untradable = self
            .client
            .get_items(&untradable_params)
            .await
            .map_err(|err| {
                error!(error = %err, "Failed to fetch untradable items");
                AppError::Internal
            })?;

        let items = merge_listings(&tradable, &untradable);
        self.cache.set(ITEMS_CACHE_KEY, items.clone(), self.ttl);
        Ok(items)
    }
}
