use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::domain::MarketItem;

use super::{MarketClient, MarketError};

pub const DEFAULT_SKINPORT_BASE_URL: &str = "https://api.skinport.com/v1";

/// Client for the Skinport `/items` endpoint.
///
/// Skinport serves brotli-compressed JSON; decoding is left to reqwest's
/// `brotli` feature, which also advertises `Accept-Encoding: br`.
#[derive(Clone)]
pub struct SkinportClient {
    client: Client,
    base_url: String,
}

impl SkinportClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn items_url(&self, params: &HashMap<String, String>) -> Result<Url, MarketError> {
        let raw = format!("{}/items", self.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&raw).map_err(|err| MarketError::InvalidUrl {
            url: raw.clone(),
            reason: err.to_string(),
        })?;

        if !params.is_empty() {
            let mut sorted: Vec<_> = params.iter().collect();
            sorted.sort();
            let mut pairs = url.query_pairs_mut();
            for (key, value) in sorted {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl MarketClient for SkinportClient {
    async fn get_items(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<MarketItem>, MarketError> {
        let url = self.items_url(params)?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(MarketError::Status(resp.status()));
        }
        Ok(resp.json().await?)
    }
}
