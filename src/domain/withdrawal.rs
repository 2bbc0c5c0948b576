use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Balances and withdrawal amounts are whole units of the account currency.
pub type Amount = i64;

/// Immutable audit record of a single debit.
/// At most one exists per `(user_id, request_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub user_id: UserId,
    /// Idempotency key supplied by (or generated for) the client
    pub request_id: String,
    /// Debited amount (always positive)
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub created_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Build the audit record for a debit that left `balance_after` on the account.
    pub fn from_debit(
        user_id: UserId,
        request_id: impl Into<String>,
        amount: Amount,
        balance_after: Amount,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            request_id: request_id.into(),
            amount,
            balance_before: balance_after + amount,
            balance_after,
            created_at,
        }
    }

    /// Returns true if the record satisfies the ledger invariants.
    pub fn is_consistent(&self) -> bool {
        self.amount > 0
            && self.balance_after >= 0
            && self.balance_after == self.balance_before - self.amount
    }
}

/// Generate a fresh opaque idempotency key.
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}
