mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{StubMarket, app_state, market_item, test_repository};
use tower::ServiceExt;
use tradedesk::application::{AppError, ItemService};
use tradedesk::cache::TtlCache;
use tradedesk::domain::ItemPrice;
use tradedesk::http::{ErrorBody, build_router};

fn stocked_market() -> Arc<StubMarket> {
    Arc::new(StubMarket::with_listings(
        vec![market_item("AK-47 | Redline", 10.0), market_item("AWP | Asiimov", 50.0)],
        vec![market_item("AK-47 | Redline", 7.5), market_item("Souvenir Case", 1.25)],
    ))
}

#[tokio::test]
async fn test_items_merge_both_listings() -> Result<()> {
    let market = stocked_market();
    let service = ItemService::new(market.clone(), Arc::new(TtlCache::new()));

    let items = service.get_items().await?;
    assert_eq!(items.len(), 3);
    assert_eq!(market.call_count(), 2);

    let redline = items
        .iter()
        .find(|i| i.market_hash_name == "AK-47 | Redline")
        .unwrap();
    assert_eq!(redline.tradable_min_price, Some(10.0));
    assert_eq!(redline.untradable_min_price, Some(7.5));

    let case = items
        .iter()
        .find(|i| i.market_hash_name == "Souvenir Case")
        .unwrap();
    assert_eq!(case.tradable_min_price, None);
    assert_eq!(case.untradable_min_price, Some(1.25));

    Ok(())
}

#[tokio::test]
async fn test_items_served_from_cache() -> Result<()> {
    let market = stocked_market();
    let cache = Arc::new(TtlCache::new());
    let service = ItemService::new(market.clone(), cache.clone());

    let first = service.get_items().await?;
    let second = service.get_items().await?;

    assert_eq!(first, second);
    assert_eq!(market.call_count(), 2);
    assert_eq!(cache.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_items_refetched_after_ttl() -> Result<()> {
    let market = stocked_market();
    let service =
        ItemService::new(market.clone(), Arc::new(TtlCache::new())).with_ttl(Duration::ZERO);

    service.get_items().await?;
    service.get_items().await?;

    assert_eq!(market.call_count(), 4);

    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_is_internal_and_not_cached() -> Result<()> {
    let market = Arc::new(StubMarket::failing());
    let cache = Arc::new(TtlCache::new());
    let service = ItemService::new(market.clone(), cache.clone());

    let result = service.get_items().await;
    assert!(matches!(result, Err(AppError::Internal)));
    // Stops after the first failed fetch
    assert_eq!(market.call_count(), 1);
    assert!(cache.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_items_endpoint() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let router = build_router(app_state(repo, stocked_market()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/items/list")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let items: Vec<ItemPrice> = serde_json::from_slice(&bytes)?;
    let names: Vec<&str> = items.iter().map(|i| i.market_hash_name.as_str()).collect();
    assert_eq!(names, vec!["AK-47 | Redline", "AWP | Asiimov", "Souvenir Case"]);

    Ok(())
}

#[tokio::test]
async fn test_items_endpoint_upstream_failure() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let router = build_router(app_state(repo, Arc::new(StubMarket::failing())));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/items/list")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: ErrorBody = serde_json::from_slice(&bytes)?;
    assert_eq!(body.message, "internal server error");

    Ok(())
}
