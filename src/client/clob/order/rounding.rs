//! Tick-size table, price validation, rounding, and market-price calculation.
//!
//! The exchange rejects orders whose amounts disagree with the tick's
//! precision, so the rounding sequence here is part of the wire contract.

use crate::client::clob::orderbook::BookLevel;
use crate::client::clob::types::OrderType;
use crate::error::{ClobError, Result};

// =============================================================================
// Tick size
// =============================================================================

/// Minimum price increment for a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickSize {
    /// 0.1
    TenCents,
    /// 0.01
    #[default]
    OneCent,
    /// 0.001
    TenthCent,
    /// 0.0001
    HundredthCent,
}

impl TickSize {
    /// Tick size as a float.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::TenCents => 0.1,
            Self::OneCent => 0.01,
            Self::TenthCent => 0.001,
            Self::HundredthCent => 0.0001,
        }
    }

    /// Canonical string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TenCents => "0.1",
            Self::OneCent => "0.01",
            Self::TenthCent => "0.001",
            Self::HundredthCent => "0.0001",
        }
    }

    /// Parses a tick size, tolerating trailing zeros ("0.010000") and plain
    /// float renderings the server sometimes emits.
    pub fn parse(input: &str) -> Result<Self> {
        let value: f64 = input
            .trim()
            .parse()
            .map_err(|_| ClobError::InvalidTickSize(input.to_string()))?;
        Self::from_f64(value).ok_or_else(|| ClobError::InvalidTickSize(input.to_string()))
    }

    /// Maps a float to the supported tick set.
    pub fn from_f64(value: f64) -> Option<Self> {
        for tick in [
            Self::TenCents,
            Self::OneCent,
            Self::TenthCent,
            Self::HundredthCent,
        ] {
            if (value - tick.as_f64()).abs() < 1e-9 {
                return Some(tick);
            }
        }
        None
    }
}

impl std::fmt::Display for TickSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TickSize {
    type Err = ClobError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// =============================================================================
// Rounding configuration
// =============================================================================

/// Decimal precision bundle for a tick size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundConfig {
    /// Decimal places for price.
    pub price: u32,
    /// Decimal places for size.
    pub size: u32,
    /// Decimal places for derived amounts.
    pub amount: u32,
}

/// Rounding configuration for a tick size.
pub fn get_round_config(tick_size: TickSize) -> RoundConfig {
    match tick_size {
        TickSize::TenCents => RoundConfig {
            price: 1,
            size: 2,
            amount: 3,
        },
        TickSize::OneCent => RoundConfig {
            price: 2,
            size: 2,
            amount: 4,
        },
        TickSize::TenthCent => RoundConfig {
            price: 3,
            size: 2,
            amount: 5,
        },
        TickSize::HundredthCent => RoundConfig {
            price: 4,
            size: 2,
            amount: 6,
        },
    }
}

// =============================================================================
// Price validation
// =============================================================================

/// Whether `tick <= price <= 1 - tick`.
pub fn price_valid(price: f64, tick_size: TickSize) -> bool {
    let tick = tick_size.as_f64();
    price >= tick && price <= 1.0 - tick
}

/// Validates a price against the tick range.
pub fn validate_price(price: f64, tick_size: TickSize) -> Result<()> {
    if price_valid(price, tick_size) {
        Ok(())
    } else {
        Err(ClobError::InvalidPrice {
            price,
            tick: tick_size.as_f64(),
        })
    }
}

// =============================================================================
// Rounding utilities
// =============================================================================

/// Counts the decimal places of a value, ignoring floating-point noise past
/// the twelfth digit.
pub fn decimal_places(value: f64) -> u32 {
    if value.floor() == value {
        return 0;
    }
    let formatted = format!("{:.12}", value);
    match formatted.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

/// Rounds to the nearest value at `decimals` places.
pub fn round_normal(value: f64, decimals: u32) -> f64 {
    if decimal_places(value) <= decimals {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Rounds down at `decimals` places.
pub fn round_down(value: f64, decimals: u32) -> f64 {
    if decimal_places(value) <= decimals {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).floor() / scale
}

/// Rounds up at `decimals` places.
pub fn round_up(value: f64, decimals: u32) -> f64 {
    if decimal_places(value) <= decimals {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).ceil() / scale
}

// =============================================================================
// Market amounts
// =============================================================================

/// Maker/taker amounts for a market order at a validated price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawAmounts {
    /// Rounded price.
    pub price: f64,
    /// Maker amount (collateral for BUY, shares for SELL).
    pub maker: f64,
    /// Taker amount after precision adjustment.
    pub taker: f64,
}

/// Derives maker/taker amounts from a user amount and price.
///
/// The taker amount is squeezed into the tick's precision in two stages:
/// first rounded up four places past the amount precision, then, when still
/// too wide, rounded down to the amount precision.
pub fn derive_market_amounts(
    side: crate::client::clob::order::Side,
    amount: f64,
    price: f64,
    config: &RoundConfig,
) -> RawAmounts {
    use crate::client::clob::order::Side;

    let raw_price = round_normal(price, config.price);
    let raw_maker = round_down(amount, config.size);

    let mut raw_taker = match side {
        Side::Buy => {
            if raw_price > 0.0 {
                raw_maker / raw_price
            } else {
                0.0
            }
        }
        Side::Sell => raw_maker * raw_price,
    };

    if decimal_places(raw_taker) > config.amount {
        raw_taker = round_up(raw_taker, config.amount + 4);
        if decimal_places(raw_taker) > config.amount {
            raw_taker = round_down(raw_taker, config.amount);
        }
    }

    RawAmounts {
        price: raw_price,
        maker: raw_maker,
        taker: raw_taker,
    }
}

// =============================================================================
// Market price from a book
// =============================================================================

/// Marketable BUY price: walks the asks from worst to best, accumulating
/// `price * size`, and returns the first price at which the collateral
/// amount is covered.
///
/// FOK orders that cannot be fully covered yield [`ClobError::NoMatch`];
/// other order types fall back to the best available price.
pub fn calculate_buy_market_price(
    asks: &[BookLevel],
    amount_to_match: f64,
    order_type: OrderType,
) -> Result<f64> {
    if asks.is_empty() {
        return Err(ClobError::NoMatch);
    }

    // Asks are sorted ascending; iterate from the back (worst for a buyer).
    let mut sum = 0.0;
    for level in asks.iter().rev() {
        sum += level.price * level.size;
        if sum >= amount_to_match {
            return Ok(level.price);
        }
    }

    if order_type == OrderType::Fok {
        return Err(ClobError::NoMatch);
    }
    Ok(asks[0].price)
}

/// Marketable SELL price: walks the bids from worst to best accumulating
/// share size only.
pub fn calculate_sell_market_price(
    bids: &[BookLevel],
    amount_to_match: f64,
    order_type: OrderType,
) -> Result<f64> {
    if bids.is_empty() {
        return Err(ClobError::NoMatch);
    }

    // Bids are sorted descending; iterate from the back (worst for a seller).
    let mut sum = 0.0;
    for level in bids.iter().rev() {
        sum += level.size;
        if sum >= amount_to_match {
            return Ok(level.price);
        }
    }

    if order_type == OrderType::Fok {
        return Err(ClobError::NoMatch);
    }
    Ok(bids[0].price)
}
