use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::application::{BalanceService, WithdrawalResponse};
use crate::domain::{Amount, UserId, new_request_id};
use crate::server::{self, ServerConfig};
use crate::storage::{LedgerStore, Repository, sqlite_url};

/// tradedesk - marketplace prices and an idempotent balance ledger
#[derive(Parser, Debug)]
#[command(name = "tradedesk")]
#[command(about = "REST service for marketplace item prices and per-user balance withdrawals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "TRADEDESK_DATABASE", default_value = "tradedesk.db", global = true)]
    pub database: String,

    /// Address the API server listens on
    #[arg(long, env = "TRADEDESK_ADDR", default_value = "127.0.0.1:8080", global = true)]
    pub addr: SocketAddr,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "TRADEDESK_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Marketplace API base URL
    #[arg(long, env = "TRADEDESK_SKINPORT_URL", default_value = crate::market::DEFAULT_SKINPORT_BASE_URL, global = true)]
    pub skinport_base_url: String,

    /// Deadline for one balance operation, in milliseconds
    #[arg(long, env = "TRADEDESK_REQUEST_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub request_timeout_ms: u64,

    /// How long the merged item list stays cached, in seconds
    #[arg(long, env = "TRADEDESK_ITEMS_TTL_SECS", default_value_t = 300, global = true)]
    pub items_cache_ttl_secs: u64,

    /// Size of the database connection pool
    #[arg(
        long,
        env = "TRADEDESK_DB_MAX_CONNECTIONS",
        default_value_t = crate::storage::DEFAULT_MAX_CONNECTIONS,
        global = true
    )]
    pub max_connections: u32,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the REST API server (default)
    Serve,

    /// Initialize a new database
    Init,

    /// User and balance management commands
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user with an opening balance
    Create {
        #[arg(short, long, default_value_t = 0)]
        balance: Amount,
    },

    /// Show a user's balance
    Show { id: UserId },

    /// Withdraw from a user's balance
    Withdraw {
        id: UserId,

        amount: Amount,

        /// Idempotency key (generated if omitted)
        #[arg(short, long)]
        request_id: Option<String>,
    },

    /// List a user's withdrawals, newest first
    History { id: UserId },
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            database: self.database.clone(),
            skinport_base_url: self.skinport_base_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            items_cache_ttl: Duration::from_secs(self.items_cache_ttl_secs),
            max_connections: self.max_connections,
        }
    }

    async fn open_repository(&self) -> Result<Repository> {
        Repository::init(&sqlite_url(&self.database), self.max_connections).await
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            None | Some(Commands::Serve) => server::serve(self.server_config()).await?,

            Some(Commands::Init) => {
                let repo = self.open_repository().await?;
                repo.close().await;
                println!("Database initialized: {}", self.database);
            }

            Some(Commands::User(cmd)) => {
                let repo = self.open_repository().await?;
                let result = self.run_user_command(&repo, cmd).await;
                repo.close().await;
                result?;
            }
        }
        Ok(())
    }

    async fn run_user_command(&self, repo: &Repository, cmd: &UserCommands) -> Result<()> {
        let service = BalanceService::new(Arc::new(repo.clone()))
            .with_timeout(Duration::from_millis(self.request_timeout_ms));

        match cmd {
            UserCommands::Create { balance } => {
                let user = repo.create_user(*balance).await?;
                println!("Created user {} with balance {}", user.id, user.balance);
            }

            UserCommands::Show { id } => {
                let user = repo.get_user_by_id(*id).await?;
                println!("User {}: balance {}", user.id, user.balance);
            }

            UserCommands::Withdraw {
                id,
                amount,
                request_id,
            } => {
                let request_id = request_id.clone().unwrap_or_else(new_request_id);
                let withdrawal = service
                    .withdraw_from_balance(*id, *amount, &request_id)
                    .await?;
                println!("Request id: {}", request_id);
                print_withdrawals(std::slice::from_ref(&withdrawal));
            }

            UserCommands::History { id } => {
                let history = service.get_balance_history(*id).await?;
                if history.is_empty() {
                    println!("No withdrawals found.");
                } else {
                    print_withdrawals(&history);
                }
            }
        }
        Ok(())
    }
}

fn print_withdrawals(withdrawals: &[WithdrawalResponse]) {
    println!(
        "{:<20} {:>10} {:>12} {:>12}",
        "DATE", "AMOUNT", "BEFORE", "AFTER"
    );
    println!("{}", "-".repeat(57));
    for w in withdrawals {
        println!(
            "{:<20} {:>10} {:>12} {:>12}",
            w.created_at.format("%Y-%m-%d %H:%M:%S"),
            w.amount,
            w.balance_before,
            w.balance_after
        );
    }
}
