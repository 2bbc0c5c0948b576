mod error;
mod repository;

pub use error::*;
pub use repository::*;

use async_trait::async_trait;

use crate::domain::{Amount, User, UserId, Withdrawal};

/// SQL migration for users and the withdrawal ledger
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Storage operations the balance service depends on.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Point lookup; fails with `UserNotFound` when the id is unknown.
    async fn get_user_by_id(&self, user_id: UserId) -> Result<User, StoreError>;

    /// Debit `amount` exactly once per `(user_id, request_id)`.
    /// A repeated request id replays the stored record and ignores `amount`.
    async fn withdraw_from_user_balance(
        &self,
        user_id: UserId,
        amount: Amount,
        request_id: &str,
    ) -> Result<Withdrawal, StoreError>;

    /// Withdrawals for a user, newest first. Empty when there are none.
    async fn get_balance_history(&self, user_id: UserId) -> Result<Vec<Withdrawal>, StoreError>;
}
