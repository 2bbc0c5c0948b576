//! REST boundary: routing, input validation, and response rendering.

pub mod error;
pub mod handlers;

pub use error::{ErrorBody, status_for};
pub use handlers::{IDEMPOTENCY_KEY_HEADER, WithdrawRequest};

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::application::{BalanceService, ItemService};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub balances: Arc<BalanceService>,
    pub items: Arc<ItemService>,
}

impl AppState {
    pub fn new(balances: BalanceService, items: ItemService) -> Self {
        Self {
            balances: Arc::new(balances),
            items: Arc::new(items),
        }
    }
}

/// Build the router with every endpoint mounted under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/items/list", get(handlers::list_items))
        .route("/users/:id/balance/withdraw", post(handlers::withdraw))
        .route("/users/:id/balance/history", get(handlers::balance_history));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
