//! Arbitrage watcher: stream books for selected markets and act when the
//! YES/NO combined ask drops below the trigger.

use anyhow::Result;
use clap::Args;
use polymarket_arb::client::clob::{
    ArbConfig, BatchOrderEntry, Client, CreateMarketOrderParams, MarketSnapshot, MarketSpec,
    OrderBookFeed, OrderType, Side, TradingClient,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::common::{get_env_bool, get_env_f64, trading_client_from_env};

/// Arguments for the `watch` subcommand.
#[derive(Debug, Args)]
pub struct WatchCmd {
    /// Condition IDs of the markets to watch
    #[arg(long, required = true, num_args = 1..)]
    pub condition_id: Vec<String>,
    /// Override TRIGGER_COMBINED
    #[arg(long)]
    pub trigger: Option<f64>,
}

pub async fn run(cmd: WatchCmd) -> Result<()> {
    let trigger = match cmd.trigger {
        Some(t) => t,
        None => get_env_f64("TRIGGER_COMBINED", 0.98)?,
    };
    let size_usdc = get_env_f64("SIZE_USDC", 5.0)?;
    let dry_run = get_env_bool("DRY_RUN", true);

    let client = Client::new();
    client.warm_connection().await;
    client.start_heartbeat(std::time::Duration::from_secs(25));

    let trading = if dry_run {
        None
    } else {
        Some(trading_client_from_env().await?)
    };

    let feed = OrderBookFeed::new(ArbConfig {
        trigger_combined: trigger,
        ..ArbConfig::default()
    });

    for condition_id in &cmd.condition_id {
        let market = client.get_market(condition_id).await?;
        match MarketSpec::from_market(&market) {
            Some(spec) => {
                info!(slug = %spec.slug, "watching market");
                feed.subscribe(&spec);
            }
            None => warn!(condition_id = %condition_id, "market is missing an outcome token"),
        }
    }

    // Callbacks run on the socket task; hand opportunities to this task.
    let (tx, mut rx) = mpsc::unbounded_channel::<MarketSnapshot>();
    feed.on_arb_opportunity(move |snapshot, combined| {
        info!(
            slug = %snapshot.slug,
            combined,
            ask_yes = snapshot.best_ask_yes,
            ask_no = snapshot.best_ask_no,
            "arbitrage opportunity"
        );
        let _ = tx.send(snapshot.clone());
    });

    let stream = feed.start();
    info!(markets = cmd.condition_id.len(), trigger, "watcher running");

    while let Some(snapshot) = rx.recv().await {
        match &trading {
            None => {
                info!(slug = %snapshot.slug, "DRY_RUN=true; not trading");
            }
            Some(trading) => {
                if let Err(e) = take_both_sides(trading, &snapshot, size_usdc).await {
                    warn!(error = %e, slug = %snapshot.slug, "paired order failed");
                }
            }
        }
    }

    stream.stop().await;
    client.stop_heartbeat();
    Ok(())
}

/// Buys both outcomes at their current asks with FOK legs, so either the
/// whole structure fills or nothing does.
async fn take_both_sides(
    trading: &TradingClient,
    snapshot: &MarketSnapshot,
    size_usdc: f64,
) -> Result<()> {
    let mut entries = Vec::with_capacity(2);
    for (token_id, price) in [
        (&snapshot.token_yes, snapshot.best_ask_yes),
        (&snapshot.token_no, snapshot.best_ask_no),
    ] {
        let params = CreateMarketOrderParams {
            token_id: token_id.clone(),
            amount: size_usdc,
            side: Side::Buy,
            price: Some(price),
            order_type: OrderType::Fok,
            neg_risk: Some(snapshot.neg_risk),
            ..Default::default()
        };
        let order = trading.create_market_order(&params).await?;
        entries.push(BatchOrderEntry {
            order,
            order_type: OrderType::Fok,
        });
    }

    let responses = trading.post_orders(&entries, false).await?;
    for response in responses {
        if response.success {
            info!(order_id = %response.order_id, status = %response.status, "leg placed");
        } else {
            warn!(error = %response.error_msg, "leg rejected");
        }
    }
    Ok(())
}
