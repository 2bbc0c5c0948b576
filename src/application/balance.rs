use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::{Amount, UserId, Withdrawal};
use crate::storage::{LedgerStore, StoreError};

use super::AppError;

/// Default deadline for one balance operation, store round-trips included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Withdrawal as rendered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub user_id: UserId,
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub created_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self {
            user_id: w.user_id,
            amount: w.amount,
            balance_before: w.balance_before,
            balance_after: w.balance_after,
            created_at: w.created_at,
        }
    }
}

/// Use cases over the per-user balance ledger.
pub struct BalanceService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl BalanceService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Debit `amount` from the user's balance, once per `request_id`.
    ///
    /// Replaying a request id returns the original withdrawal even when
    /// `amount` differs.
    pub async fn withdraw_from_balance(
        &self,
        user_id: UserId,
        amount: Amount,
        request_id: &str,
    ) -> Result<WithdrawalResponse, AppError> {
        if amount <= 0 {
            return Err(AppError::invalid_amount());
        }

        let withdrawal = self
            .within_deadline("withdraw", async {
                self.store.get_user_by_id(user_id).await?;
                self.store
                    .withdraw_from_user_balance(user_id, amount, request_id)
                    .await
            })
            .await?;

        Ok(withdrawal.into())
    }

    /// Withdrawals for an existing user, newest first.
    pub async fn get_balance_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<WithdrawalResponse>, AppError> {
        let history = self
            .within_deadline("balance history", async {
                self.store.get_user_by_id(user_id).await?;
                self.store.get_balance_history(user_id).await
            })
            .await?;

        Ok(history.into_iter().map(WithdrawalResponse::from).collect())
    }

    /// Run a store operation under the service deadline.
    /// On expiry the future is dropped, which rolls back any open transaction.
    async fn within_deadline<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|err| map_store_error(operation, err)),
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "Store operation timed out");
                Err(AppError::Internal)
            }
        }
    }
}

fn map_store_error(operation: &'static str, err: StoreError) -> AppError {
    match err {
        StoreError::UserNotFound(user_id) => AppError::UserNotFound(user_id),
        StoreError::InsufficientFunds { .. } => AppError::InsufficientFunds,
        StoreError::DuplicateRequest {
            user_id,
            request_id,
        } => {
            warn!(operation, user_id, %request_id, "Concurrent duplicate withdrawal");
            AppError::Conflict
        }
        other => {
            error!(operation, error = %other, "Store operation failed");
            AppError::Internal
        }
    }
}
