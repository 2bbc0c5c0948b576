use thiserror::Error;

use crate::domain::UserId;

pub const INVALID_USER_ID_MESSAGE: &str = "invalid user id";
pub const INVALID_AMOUNT_MESSAGE: &str = "invalid amount: Amount must be greater than 0";

/// Category of an [`AppError`], used by the transport layer to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    Conflict,
    Internal,
}

/// Domain-level failure. The `Display` text is safe to show to clients.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("user not found")]
    UserNotFound(UserId),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("a withdrawal with this idempotency key is in progress, retry the request")]
    Conflict,

    /// Cause is logged where the error is created, never rendered.
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::UserNotFound(_) => ErrorKind::NotFound,
            AppError::InsufficientFunds => ErrorKind::InsufficientFunds,
            AppError::Conflict => ErrorKind::Conflict,
            AppError::Internal => ErrorKind::Internal,
        }
    }

    pub fn invalid_user_id() -> Self {
        AppError::Validation(INVALID_USER_ID_MESSAGE.to_string())
    }

    pub fn invalid_amount() -> Self {
        AppError::Validation(INVALID_AMOUNT_MESSAGE.to_string())
    }
}
