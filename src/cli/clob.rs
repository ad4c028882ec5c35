//! CLOB commands: discovery, books, and order submission.

use anyhow::Result;
use clap::Args;
use polymarket_arb::client::clob::{Client, CreateOrderParams, OrderType, Side};

use super::common::{get_env_bool, trading_client_from_env, write_json_output};

pub async fn markets(cursor: &str) -> Result<()> {
    let client = Client::new();
    let page = client.get_markets(cursor).await?;
    write_json_output(&page)?;
    Ok(())
}

pub async fn book(token_id: &str) -> Result<()> {
    let client = Client::new();
    let book = client.get_order_book(token_id).await?;
    write_json_output(&serde_json::json!({
        "asset_id": book.asset_id,
        "best_bid": book.best_bid(),
        "best_ask": book.best_ask(),
        "bids": book.bids,
        "asks": book.asks,
    }))?;
    Ok(())
}

pub async fn server_time() -> Result<()> {
    let client = Client::new();
    println!("{}", client.get_server_time().await?);
    Ok(())
}

/// Arguments for the `order` subcommand.
#[derive(Debug, Args)]
pub struct OrderCmd {
    /// Outcome token ID
    #[arg(long)]
    pub token_id: String,
    /// BUY or SELL
    #[arg(long)]
    pub side: Side,
    /// Limit price
    #[arg(long)]
    pub price: f64,
    /// Size in shares
    #[arg(long)]
    pub size: f64,
    /// Time-in-force
    #[arg(long, default_value = "GTC")]
    pub order_type: String,
}

pub async fn order(cmd: OrderCmd) -> Result<()> {
    let client = trading_client_from_env().await?;

    let params = CreateOrderParams {
        token_id: cmd.token_id,
        price: cmd.price,
        size: cmd.size,
        side: cmd.side,
        ..Default::default()
    };

    let order_type = match cmd.order_type.to_uppercase().as_str() {
        "GTC" => OrderType::Gtc,
        "GTD" => OrderType::Gtd,
        "FOK" => OrderType::Fok,
        "FAK" => OrderType::Fak,
        other => anyhow::bail!("unknown order type: {other}"),
    };

    let signed = client.create_order(&params).await?;
    if get_env_bool("DRY_RUN", true) {
        println!("DRY_RUN=true; signed order not submitted:");
        write_json_output(&signed.to_json())?;
        return Ok(());
    }

    let response = client.post_order(&signed, order_type, false).await?;
    write_json_output(&response)?;
    Ok(())
}
