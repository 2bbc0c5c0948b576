use anyhow::Result;
use clap::Parser;
use tradedesk::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tradedesk::logging::init(&cli.log_level);
    cli.run().await
}
