//! Price, midpoint, spread, and market-metadata endpoints, plus the
//! book-walking market-price calculation.

use serde::Deserialize;
use tracing::{instrument, trace};

use super::order::rounding::{calculate_buy_market_price, calculate_sell_market_price, TickSize};
use super::order::Side;
use super::types::OrderType;
use super::Client;
use crate::error::Result;

/// Price for one token on one side.
#[derive(Debug, Clone)]
pub struct PriceInfo {
    pub token_id: String,
    pub price: f64,
}

/// Midpoint between best bid and best ask.
#[derive(Debug, Clone)]
pub struct MidpointInfo {
    pub token_id: String,
    pub mid: f64,
}

/// Bid/ask spread for one token.
#[derive(Debug, Clone)]
pub struct SpreadInfo {
    pub token_id: String,
    pub spread: f64,
}

#[derive(Deserialize)]
struct PriceBody {
    price: String,
}

#[derive(Deserialize)]
struct MidBody {
    mid: String,
}

#[derive(Deserialize)]
struct SpreadBody {
    spread: String,
}

#[derive(Deserialize)]
struct TickSizeBody {
    minimum_tick_size: serde_json::Value,
}

#[derive(Deserialize)]
struct NegRiskBody {
    #[serde(default)]
    neg_risk: bool,
}

#[derive(Deserialize)]
struct FeeRateBody {
    #[serde(default)]
    base_fee: u64,
}

impl Client {
    /// Best price for a token on the given side.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_price(&self, token_id: &str, side: Side) -> Result<PriceInfo> {
        let side_param = match side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        let path = format!("/price?token_id={}&side={}", token_id, side_param);
        let body: PriceBody = self.get_json(&path).await?;
        let price = body
            .price
            .parse()
            .map_err(|_| crate::error::ClobError::other("unparsable price"))?;
        trace!(token_id, price, "received price");
        Ok(PriceInfo {
            token_id: token_id.to_string(),
            price,
        })
    }

    /// Price of the most recent trade.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_last_trade_price(&self, token_id: &str) -> Result<PriceInfo> {
        let path = format!("/last-trade-price?token_id={}", token_id);
        let body: PriceBody = self.get_json(&path).await?;
        let price = body
            .price
            .parse()
            .map_err(|_| crate::error::ClobError::other("unparsable price"))?;
        Ok(PriceInfo {
            token_id: token_id.to_string(),
            price,
        })
    }

    /// Midpoint of the current book.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_midpoint(&self, token_id: &str) -> Result<MidpointInfo> {
        let path = format!("/midpoint?token_id={}", token_id);
        let body: MidBody = self.get_json(&path).await?;
        let mid = body
            .mid
            .parse()
            .map_err(|_| crate::error::ClobError::other("unparsable midpoint"))?;
        Ok(MidpointInfo {
            token_id: token_id.to_string(),
            mid,
        })
    }

    /// Bid/ask spread of the current book.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_spread(&self, token_id: &str) -> Result<SpreadInfo> {
        let path = format!("/spread?token_id={}", token_id);
        let body: SpreadBody = self.get_json(&path).await?;
        let spread = body
            .spread
            .parse()
            .map_err(|_| crate::error::ClobError::other("unparsable spread"))?;
        Ok(SpreadInfo {
            token_id: token_id.to_string(),
            spread,
        })
    }

    /// Minimum tick size for a market. The server emits it as a string or a
    /// number depending on the endpoint vintage.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_tick_size(&self, token_id: &str) -> Result<TickSize> {
        let path = format!("/tick-size?token_id={}", token_id);
        let body: TickSizeBody = self.get_json(&path).await?;
        let tick = match &body.minimum_tick_size {
            serde_json::Value::String(s) => TickSize::parse(s)?,
            serde_json::Value::Number(n) => {
                let v = n.as_f64().unwrap_or(0.0);
                TickSize::from_f64(v)
                    .ok_or_else(|| crate::error::ClobError::InvalidTickSize(v.to_string()))?
            }
            other => {
                return Err(crate::error::ClobError::InvalidTickSize(other.to_string()));
            }
        };
        trace!(token_id, tick = %tick, "received tick size");
        Ok(tick)
    }

    /// Whether the market clears against the neg-risk exchange.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_neg_risk(&self, token_id: &str) -> Result<bool> {
        let path = format!("/neg-risk?token_id={}", token_id);
        let body: NegRiskBody = self.get_json(&path).await?;
        Ok(body.neg_risk)
    }

    /// Current taker fee rate in basis points.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_fee_rate_bps(&self, token_id: &str) -> Result<u64> {
        let path = format!("/fee-rate?token_id={}", token_id);
        let body: FeeRateBody = self.get_json(&path).await?;
        Ok(body.base_fee)
    }

    /// Marketable price for an amount, walking the live book.
    ///
    /// BUY walks the asks accumulating collateral, SELL walks the bids
    /// accumulating shares; both from the worst level toward the best.
    #[instrument(skip(self), level = "trace")]
    pub async fn calculate_market_price(
        &self,
        token_id: &str,
        side: Side,
        amount: f64,
        order_type: OrderType,
    ) -> Result<f64> {
        let book = self.get_order_book(token_id).await?;
        match side {
            Side::Buy => calculate_buy_market_price(&book.asks, amount, order_type),
            Side::Sell => calculate_sell_market_price(&book.bids, amount, order_type),
        }
    }
}
