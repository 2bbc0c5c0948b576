//! Marketplace price listings.

mod skinport;

pub use skinport::*;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::MarketItem;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unexpected status from marketplace: {0}")]
    Status(reqwest::StatusCode),
}

/// Source of marketplace listings. `params` are passed as query parameters.
#[async_trait]
pub trait MarketClient: Send + Sync {
    async fn get_items(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<MarketItem>, MarketError>;
}
