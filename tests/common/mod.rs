// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use tradedesk::application::{BalanceService, ItemService};
use tradedesk::cache::TtlCache;
use tradedesk::domain::{Amount, MarketItem, User};
use tradedesk::http::AppState;
use tradedesk::market::{MarketClient, MarketError};
use tradedesk::storage::{Repository, sqlite_url};

/// URL of the database file inside a test's temporary directory
pub fn database_url(temp_dir: &TempDir) -> String {
    let db_path = temp_dir.path().join("test.db");
    sqlite_url(db_path.to_str().unwrap())
}

/// Helper to create a repository over a temporary database
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let repo = Repository::init(&database_url(&temp_dir), 8).await?;
    Ok((repo, temp_dir))
}

/// Helper to create a balance service plus the repository behind it
pub async fn test_service() -> Result<(Arc<BalanceService>, Repository, TempDir)> {
    let (repo, temp_dir) = test_repository().await?;
    let service = BalanceService::new(Arc::new(repo.clone()));
    Ok((Arc::new(service), repo, temp_dir))
}

/// Insert a user with the given opening balance
pub async fn seed_user(repo: &Repository, balance: Amount) -> Result<User> {
    Ok(repo.create_user(balance).await?)
}

/// Marketplace listing with sensible defaults
pub fn market_item(name: &str, min_price: f64) -> MarketItem {
    MarketItem {
        market_hash_name: name.to_string(),
        version: None,
        currency: "EUR".to_string(),
        suggested_price: Some(min_price),
        item_page: format!("https://skinport.com/item/{}", name),
        market_page: format!("https://skinport.com/market?search={}", name),
        min_price: Some(min_price),
        max_price: Some(min_price * 2.0),
        mean_price: Some(min_price * 1.5),
        median_price: Some(min_price * 1.5),
        quantity: 1,
        created_at: 1_700_000_000,
        updated_at: 1_700_000_000,
    }
}

/// Marketplace double: answers from fixed listings and counts calls.
#[derive(Default)]
pub struct StubMarket {
    pub tradable: Vec<MarketItem>,
    pub untradable: Vec<MarketItem>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubMarket {
    pub fn with_listings(tradable: Vec<MarketItem>, untradable: Vec<MarketItem>) -> Self {
        Self {
            tradable,
            untradable,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketClient for StubMarket {
    async fn get_items(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<MarketItem>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MarketError::InvalidUrl {
                url: "http://upstream.invalid".to_string(),
                reason: "stubbed failure".to_string(),
            });
        }
        match params.get("tradable").map(String::as_str) {
            Some("0") => Ok(self.untradable.clone()),
            _ => Ok(self.tradable.clone()),
        }
    }
}

/// Handler state over a real repository and a stub marketplace
pub fn app_state(repo: Repository, market: Arc<StubMarket>) -> AppState {
    let balances = BalanceService::new(Arc::new(repo));
    let items = ItemService::new(market, Arc::new(TtlCache::new()));
    AppState::new(balances, items)
}
