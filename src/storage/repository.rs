use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::domain::{Amount, User, UserId, Withdrawal};

use super::{LedgerStore, MIGRATION_001_INITIAL, StoreError};

/// Default number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// How long a unit of work waits for the database write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const WITHDRAWAL_COLUMNS: &str =
    "user_id, request_id, amount, balance_before, balance_after, created_at";

/// Repository for user balances and the withdrawal ledger.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database, creating the file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit pool size.
    pub async fn connect_with(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str, max_connections: u32) -> Result<Self> {
        let repo = Self::connect_with(database_url, max_connections).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // User operations
    // ========================

    /// Insert a user with an opening balance.
    pub async fn create_user(&self, balance: Amount) -> Result<User, StoreError> {
        if balance < 0 {
            return Err(StoreError::InvalidBalance(balance));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO users (balance, created_at)
            VALUES (?, ?)
            RETURNING id, balance, created_at
            "#,
        )
        .bind(balance)
        .bind(format_timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await
        .context("Failed to create user")?;

        Ok(Self::row_to_user(&row)?)
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: row.get("id"),
            balance: row.get("balance"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Withdrawal operations
    // ========================

    /// One attempt of the withdrawal protocol inside a single transaction.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock before the idempotency lookup, so
    /// competing writers wait on the busy timeout instead of failing a lock
    /// upgrade halfway through. Any early return drops `tx`, which rolls back.
    async fn try_withdraw(
        &self,
        user_id: UserId,
        amount: Amount,
        request_id: &str,
    ) -> Result<Withdrawal, StoreError> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin withdrawal transaction")?;

        if let Some(existing) = Self::find_withdrawal(&mut tx, user_id, request_id).await? {
            tx.commit()
                .await
                .context("Failed to commit withdrawal replay")?;
            return Ok(existing);
        }

        let balance_after: Option<Amount> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET balance = balance - ?
            WHERE id = ? AND balance >= ?
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to debit user balance")?;

        let Some(balance_after) = balance_after else {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to fetch user")?;

            return Err(match exists {
                Some(_) => StoreError::InsufficientFunds {
                    user_id,
                    requested: amount,
                },
                None => StoreError::UserNotFound(user_id),
            });
        };

        let pending = Withdrawal::from_debit(user_id, request_id, amount, balance_after, Utc::now());
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO balance_withdrawals (user_id, request_id, amount, balance_before, balance_after, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {WITHDRAWAL_COLUMNS}
            "#
        ))
        .bind(pending.user_id)
        .bind(&pending.request_id)
        .bind(pending.amount)
        .bind(pending.balance_before)
        .bind(pending.balance_after)
        .bind(format_timestamp(pending.created_at))
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Err(StoreError::DuplicateRequest {
                    user_id,
                    request_id: request_id.to_string(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context("Failed to record withdrawal")
                    .into());
            }
        };
        let withdrawal = Self::row_to_withdrawal(&row)?;

        tx.commit().await.context("Failed to commit withdrawal")?;
        Ok(withdrawal)
    }

    /// Second lookup after an insert lost the race on `(user_id, request_id)`.
    ///
    /// Replays the competing record once it is committed; otherwise fails with
    /// `DuplicateRequest` so the caller can retry.
    pub async fn resolve_duplicate(
        &self,
        user_id: UserId,
        request_id: &str,
    ) -> Result<Withdrawal, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;

        Self::find_withdrawal(&mut conn, user_id, request_id)
            .await?
            .ok_or_else(|| StoreError::DuplicateRequest {
                user_id,
                request_id: request_id.to_string(),
            })
    }

    async fn find_withdrawal(
        conn: &mut SqliteConnection,
        user_id: UserId,
        request_id: &str,
    ) -> Result<Option<Withdrawal>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {WITHDRAWAL_COLUMNS}
            FROM balance_withdrawals
            WHERE user_id = ? AND request_id = ?
            "#
        ))
        .bind(user_id)
        .bind(request_id)
        .fetch_optional(conn)
        .await
        .context("Failed to look up withdrawal by request id")?;

        row.as_ref().map(Self::row_to_withdrawal).transpose()
    }

    fn row_to_withdrawal(row: &SqliteRow) -> Result<Withdrawal> {
        let created_at_str: String = row.get("created_at");

        Ok(Withdrawal {
            user_id: row.get("user_id"),
            request_id: row.get("request_id"),
            amount: row.get("amount"),
            balance_before: row.get("balance_before"),
            balance_after: row.get("balance_after"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

#[async_trait]
impl LedgerStore for Repository {
    async fn get_user_by_id(&self, user_id: UserId) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, balance, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => Ok(Self::row_to_user(&row)?),
            None => Err(StoreError::UserNotFound(user_id)),
        }
    }

    async fn withdraw_from_user_balance(
        &self,
        user_id: UserId,
        amount: Amount,
        request_id: &str,
    ) -> Result<Withdrawal, StoreError> {
        match self.try_withdraw(user_id, amount, request_id).await {
            Err(StoreError::DuplicateRequest { .. }) => {
                self.resolve_duplicate(user_id, request_id).await
            }
            result => result,
        }
    }

    async fn get_balance_history(&self, user_id: UserId) -> Result<Vec<Withdrawal>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {WITHDRAWAL_COLUMNS}
            FROM balance_withdrawals
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list withdrawals")?;

        Ok(rows
            .iter()
            .map(Self::row_to_withdrawal)
            .collect::<Result<Vec<_>>>()?)
    }
}

/// Turn a database file path into a sqlx SQLite URL. URLs pass through unchanged.
pub fn sqlite_url(path: &str) -> String {
    if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite:{}", path)
    }
}

/// Fixed-width UTC timestamps keep lexical order equal to chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid created_at timestamp")?
        .with_timezone(&Utc))
}
