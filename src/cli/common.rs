//! Shared CLI helpers: JSON output and environment parsing.

use std::env;
use std::io::{self, Write};

use anyhow::{anyhow, Result};
use polymarket_arb::client::clob::order::constants::POLYGON_CHAIN_ID;
use polymarket_arb::client::clob::{ApiKeyCreds, Client, OrderBuilder, TradingClient};

/// Write pretty JSON to stdout using a streaming writer.
pub fn write_json_output<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}

pub fn get_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_env_bool(key: &str, default: bool) -> bool {
    match get_env(key) {
        None => default,
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
    }
}

pub fn get_env_f64(key: &str, default: f64) -> Result<f64> {
    match get_env(key) {
        None => Ok(default),
        Some(v) => v
            .parse::<f64>()
            .map_err(|e| anyhow!("{key} invalid float: {e}")),
    }
}

/// Builds a trading client from the environment.
///
/// `PRIVATE_KEY` is required; `FUNDER_ADDRESS` switches to proxy-wallet
/// mode, and `API_KEY`/`API_SECRET`/`API_PASSPHRASE` skip credential
/// provisioning when all three are present.
pub async fn trading_client_from_env() -> Result<TradingClient> {
    use polymarket_arb::client::clob::SignatureType;

    let private_key =
        get_env("PRIVATE_KEY").ok_or_else(|| anyhow!("PRIVATE_KEY environment variable required"))?;

    let funder = match get_env("FUNDER_ADDRESS") {
        Some(addr) => Some(addr.parse().map_err(|e| anyhow!("FUNDER_ADDRESS: {e}"))?),
        None => None,
    };
    let signature_type = funder.map(|_| SignatureType::PolyGnosisSafe);

    let builder =
        OrderBuilder::from_private_key(&private_key, POLYGON_CHAIN_ID, signature_type, funder)?;
    let client = TradingClient::new(Client::new(), builder);

    let creds = match (
        get_env("API_KEY"),
        get_env("API_SECRET"),
        get_env("API_PASSPHRASE"),
    ) {
        (Some(key), Some(secret), Some(passphrase)) => ApiKeyCreds::new(key, secret, passphrase),
        _ => client.create_or_derive_api_key().await?,
    };

    Ok(client.with_creds(creds))
}
