//! Data API commands.

use anyhow::{anyhow, Result};
use polymarket_arb::client::data::DataClient;

use super::common::{get_env, write_json_output};

pub async fn positions(user: Option<String>, redeemable: bool, mergeable: bool) -> Result<()> {
    let user = user
        .or_else(|| get_env("FUNDER_ADDRESS"))
        .ok_or_else(|| anyhow!("pass --user or set FUNDER_ADDRESS"))?;

    let client = DataClient::new();
    let positions = if redeemable {
        client.get_redeemable_positions(&user).await?
    } else if mergeable {
        client.get_mergeable_positions(&user).await?
    } else {
        client.get_positions(&user).await?
    };

    write_json_output(&positions)?;
    Ok(())
}
