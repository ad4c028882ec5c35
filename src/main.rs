use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{clob, data, watch};

#[derive(Parser)]
#[command(name = "polymarket-arb")]
#[command(about = "Latency-sensitive Polymarket CLOB client and arbitrage watcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List markets (one cursor page)
    Markets {
        /// Pagination cursor
        #[arg(long, default_value = "")]
        cursor: String,
    },
    /// Fetch the order book for a token
    Book {
        /// Outcome token ID
        token_id: String,
    },
    /// Print the exchange server time
    Time,
    /// Sign and submit a limit order
    Order(clob::OrderCmd),
    /// List positions from the Data API
    Positions {
        /// Wallet address; defaults to FUNDER_ADDRESS or the key's address
        #[arg(long)]
        user: Option<String>,
        /// Only positions redeemable after resolution
        #[arg(long)]
        redeemable: bool,
        /// Only positions where both outcomes are held
        #[arg(long)]
        mergeable: bool,
    },
    /// Watch markets for YES/NO combined-ask arbitrage
    Watch(watch::WatchCmd),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; explicit environment always wins.
    let _ = dotenvy::dotenv();

    // Set RUST_LOG=trace to see request/response logs.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Markets { cursor } => clob::markets(&cursor).await?,
        Commands::Book { token_id } => clob::book(&token_id).await?,
        Commands::Time => clob::server_time().await?,
        Commands::Order(cmd) => clob::order(cmd).await?,
        Commands::Positions {
            user,
            redeemable,
            mergeable,
        } => data::positions(user, redeemable, mergeable).await?,
        Commands::Watch(cmd) => watch::run(cmd).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_command() {
        let cli = Cli::parse_from(["polymarket-arb", "time"]);
        assert!(matches!(cli.command, Commands::Time));
    }

    #[test]
    fn parses_book_command() {
        let cli = Cli::parse_from(["polymarket-arb", "book", "1234"]);
        match cli.command {
            Commands::Book { token_id } => assert_eq!(token_id, "1234"),
            _ => panic!("expected book command"),
        }
    }
}
