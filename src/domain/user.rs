use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

pub type UserId = i64;

/// An account holder. `balance` never drops below zero; the only writer is
/// the withdrawal protocol in the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

/// Parse a user id taken from a URL path segment.
/// Only strictly positive integers are valid ids.
pub fn parse_user_id(raw: &str) -> Option<UserId> {
    match raw.trim().parse::<UserId>() {
        Ok(id) if id > 0 => Some(id),
        _ => None,
    }
}
