use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One listing entry as returned by the marketplace `/items` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketItem {
    pub market_hash_name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub currency: String,
    #[serde(default)]
    pub suggested_price: Option<f64>,
    pub item_page: String,
    pub market_page: String,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub mean_price: Option<f64>,
    #[serde(default)]
    pub median_price: Option<f64>,
    pub quantity: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Aggregated price view of an item across the tradable and untradable listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPrice {
    pub market_hash_name: String,
    pub version: Option<String>,
    pub currency: String,
    pub suggested_price: Option<f64>,
    pub item_page: String,
    pub market_page: String,
    pub max_price: Option<f64>,
    pub mean_price: Option<f64>,
    pub median_price: Option<f64>,
    pub tradable_min_price: Option<f64>,
    pub untradable_min_price: Option<f64>,
    pub quantity: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ItemPrice {
    fn from_listing(item: &MarketItem) -> Self {
        Self {
            market_hash_name: item.market_hash_name.clone(),
            version: item.version.clone(),
            currency: item.currency.clone(),
            suggested_price: item.suggested_price,
            item_page: item.item_page.clone(),
            market_page: item.market_page.clone(),
            max_price: item.max_price,
            mean_price: item.mean_price,
            median_price: item.median_price,
            tradable_min_price: None,
            untradable_min_price: None,
            quantity: item.quantity,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Merge the tradable and untradable listings into one entry per `market_hash_name`.
///
/// Descriptive fields come from the tradable listing when an item appears in
/// both; the untradable listing only contributes its minimum price. Entries
/// without a name are dropped. The result is ordered by name.
pub fn merge_listings(tradable: &[MarketItem], untradable: &[MarketItem]) -> Vec<ItemPrice> {
    let mut merged: BTreeMap<&str, ItemPrice> = BTreeMap::new();

    for item in tradable.iter().filter(|i| !i.market_hash_name.is_empty()) {
        let mut price = ItemPrice::from_listing(item);
        price.tradable_min_price = item.min_price;
        merged.insert(&item.market_hash_name, price);
    }

    for item in untradable.iter().filter(|i| !i.market_hash_name.is_empty()) {
        merged
            .entry(&item.market_hash_name)
            .or_insert_with(|| ItemPrice::from_listing(item))
            .untradable_min_price = item.min_price;
    }

    merged.into_values().collect()
}
