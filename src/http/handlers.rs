use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::{AppError, WithdrawalResponse};
use crate::domain::{Amount, ItemPrice, UserId, new_request_id, parse_user_id};

use super::AppState;

/// Header carrying the client's idempotency key. Always echoed on withdraw responses.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Amount,
}

/// `GET /items/list`
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<ItemPrice>>, AppError> {
    Ok(Json(state.items.get_items().await?))
}

/// `POST /users/:id/balance/withdraw`
pub async fn withdraw(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Response {
    let request_id = idempotency_key(&headers).unwrap_or_else(new_request_id);
    let echoed = [(IDEMPOTENCY_KEY_HEADER, request_id.clone())];

    let result = match (path_user_id(&raw_id), body) {
        (Err(err), _) => Err(err),
        (Ok(_), Err(rejection)) => Err(AppError::Validation(rejection.body_text())),
        (Ok(_), Ok(Json(WithdrawRequest { amount }))) if amount <= 0 => {
            Err(AppError::invalid_amount())
        }
        (Ok(user_id), Ok(Json(WithdrawRequest { amount }))) => {
            state
                .balances
                .withdraw_from_balance(user_id, amount, &request_id)
                .await
        }
    };

    match result {
        Ok(withdrawal) => (echoed, Json(withdrawal)).into_response(),
        Err(err) => (echoed, err).into_response(),
    }
}

/// `GET /users/:id/balance/history`
pub async fn balance_history(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<WithdrawalResponse>>, AppError> {
    let user_id = path_user_id(&raw_id)?;
    Ok(Json(state.balances.get_balance_history(user_id).await?))
}

fn path_user_id(raw: &str) -> Result<UserId, AppError> {
    parse_user_id(raw).ok_or_else(AppError::invalid_user_id)
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
}
