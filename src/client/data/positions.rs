//! Position queries against the Data API.

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use super::DataClient;
use crate::error::Result;

/// A user's position in one market outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Position {
    #[serde(default, rename = "proxyWallet")]
    pub proxy_wallet: String,
    /// Outcome token ID.
    #[serde(default)]
    pub asset: String,
    #[serde(default, rename = "conditionId")]
    pub condition_id: String,
    /// Number of shares held.
    #[serde(default)]
    pub size: f64,
    #[serde(default, rename = "avgPrice")]
    pub avg_price: f64,
    #[serde(default, rename = "initialValue")]
    pub initial_value: f64,
    #[serde(default, rename = "currentValue")]
    pub current_value: f64,
    #[serde(default, rename = "cashPnl")]
    pub cash_pnl: f64,
    #[serde(default, rename = "percentPnl")]
    pub percent_pnl: f64,
    #[serde(default, rename = "curPrice")]
    pub cur_price: f64,
    /// Market resolved and this outcome won.
    #[serde(default)]
    pub redeemable: bool,
    /// Both outcomes held; shares can be merged back to collateral.
    #[serde(default)]
    pub mergeable: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    /// "Yes" or "No".
    #[serde(default)]
    pub outcome: String,
    #[serde(default, rename = "outcomeIndex")]
    pub outcome_index: i32,
    /// Token ID of the opposite outcome.
    #[serde(default, rename = "oppositeAsset")]
    pub opposite_asset: String,
    #[serde(default, rename = "endDate")]
    pub end_date: String,
    #[serde(default, rename = "negativeRisk")]
    pub negative_risk: bool,
}

impl DataClient {
    /// All positions held by a user address.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_positions(&self, user_address: &str) -> Result<Vec<Position>> {
        let path = format!("/positions?user={}", user_address);
        let positions: Vec<Position> = self.get_json(&path).await?;
        trace!(count = positions.len(), "received positions");
        Ok(positions)
    }

    /// Positions whose market resolved in the user's favor.
    pub async fn get_redeemable_positions(&self, user_address: &str) -> Result<Vec<Position>> {
        let positions = self.get_positions(user_address).await?;
        Ok(positions.into_iter().filter(|p| p.redeemable).collect())
    }

    /// Positions where the user holds both outcomes.
    pub async fn get_mergeable_positions(&self, user_address: &str) -> Result<Vec<Position>> {
        let positions = self.get_positions(user_address).await?;
        Ok(positions.into_iter().filter(|p| p.mergeable).collect())
    }
}
