use thiserror::Error;

use crate::domain::{Amount, UserId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Insufficient funds for user {user_id}: requested {requested}")]
    InsufficientFunds { user_id: UserId, requested: Amount },

    /// A concurrent unit of work recorded the same idempotency key first.
    #[error("Concurrent withdrawal for user {user_id} with request id {request_id}")]
    DuplicateRequest { user_id: UserId, request_id: String },

    #[error("Invalid opening balance: {0}")]
    InvalidBalance(Amount),

    #[error("Database error: {0:#}")]
    Database(#[from] anyhow::Error),
}
