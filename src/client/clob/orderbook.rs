//! Order-book types, tolerant wire parsing, and the `/book` endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{instrument, trace};

use super::Client;
use crate::error::Result;

/// Nanoseconds since the UNIX epoch, for local receipt timestamps.
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// A single price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Order book for a single outcome token.
///
/// Bids are held sorted descending and asks ascending regardless of the
/// order the upstream delivered them in.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    pub asset_id: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    /// Server-side timestamp, when the envelope carried one.
    pub server_timestamp: u64,
    /// Local receipt time in nanoseconds.
    pub received_at_ns: u64,
}

impl OrderBook {
    /// Best bid = highest bid price; 0 on an empty side.
    pub fn best_bid(&self) -> f64 {
        self.bids.first().map(|l| l.price).unwrap_or(0.0)
    }

    /// Best ask = lowest ask price; 1 on an empty side.
    pub fn best_ask(&self) -> f64 {
        self.asks.first().map(|l| l.price).unwrap_or(1.0)
    }

    /// Size resting at the best bid.
    pub fn best_bid_size(&self) -> f64 {
        self.bids.first().map(|l| l.size).unwrap_or(0.0)
    }

    /// Size resting at the best ask.
    pub fn best_ask_size(&self) -> f64 {
        self.asks.first().map(|l| l.size).unwrap_or(0.0)
    }

    /// Restores the sort invariants after ingesting raw levels.
    pub fn sort_levels(&mut self) {
        self.bids
            .sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(std::cmp::Ordering::Equal));
        self.asks
            .sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Parses a book out of a JSON object holding `bids`/`asks` arrays and an
    /// `asset_id`. Level prices and sizes may be strings or numbers.
    pub fn from_json(value: &Value) -> Option<Self> {
        let asset_id = value.get("asset_id")?.as_str()?.to_string();

        let mut book = OrderBook {
            asset_id,
            received_at_ns: now_ns(),
            ..Default::default()
        };

        if let Some(ts) = value.get("timestamp") {
            book.server_timestamp = json_u64(ts).unwrap_or(0);
        }

        if let Some(bids) = value.get("bids").and_then(Value::as_array) {
            book.bids = bids.iter().filter_map(parse_level).collect();
        }
        if let Some(asks) = value.get("asks").and_then(Value::as_array) {
            book.asks = asks.iter().filter_map(parse_level).collect();
        }

        book.sort_levels();
        Some(book)
    }
}

fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parses one `{price, size}` level, tolerating string or numeric fields.
pub(crate) fn parse_level(value: &Value) -> Option<BookLevel> {
    let price = json_f64(value.get("price")?)?;
    let size = json_f64(value.get("size")?)?;
    Some(BookLevel { price, size })
}

// -----------------------------------------------------------------------------
// Client endpoints
// -----------------------------------------------------------------------------

impl Client {
    /// Fetches the order book for one token.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_order_book(&self, token_id: &str) -> Result<OrderBook> {
        let path = format!("/book?token_id={}", token_id);
        let value: Value = self.get_json(&path).await?;
        let book = OrderBook::from_json(&value)
            .ok_or_else(|| crate::error::ClobError::other("malformed order book"))?;
        trace!(
            asset_id = %book.asset_id,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "received order book"
        );
        Ok(book)
    }

    /// Fetches order books for several tokens at once, keyed by token ID.
    #[instrument(skip(self, token_ids), level = "trace")]
    pub async fn get_order_books(&self, token_ids: &[String]) -> Result<HashMap<String, OrderBook>> {
        let path = format!("/books?token_ids={}", token_ids.join(","));
        let value: Value = self.get_json(&path).await?;

        let mut books = HashMap::new();
        if let Some(items) = value.as_array() {
            for item in items {
                if let Some(book) = OrderBook::from_json(item) {
                    books.insert(book.asset_id.clone(), book);
                }
            }
        }
        trace!(count = books.len(), "received order books");
        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_string_and_number() {
        let s: Value = serde_json::json!({"price": "0.55", "size": "100"});
        let n: Value = serde_json::json!({"price": 0.55, "size": 100});
        assert_eq!(parse_level(&s), Some(BookLevel { price: 0.55, size: 100.0 }));
        assert_eq!(parse_level(&n), Some(BookLevel { price: 0.55, size: 100.0 }));
    }

    #[test]
    fn test_from_json_sorts_both_sides() {
        // Asks arrive descending (as the upstream delivers them) and bids
        // ascending; ingest must normalize both.
        let value = serde_json::json!({
            "asset_id": "123",
            "timestamp": "1700000000123",
            "bids": [
                {"price": "0.40", "size": "5"},
                {"price": "0.45", "size": "10"}
            ],
            "asks": [
                {"price": "0.60", "size": "5"},
                {"price": "0.55", "size": "10"}
            ]
        });
        let book = OrderBook::from_json(&value).unwrap();
        assert_eq!(book.asset_id, "123");
        assert_eq!(book.server_timestamp, 1700000000123);

        assert_eq!(book.best_bid(), 0.45);
        assert_eq!(book.best_ask(), 0.55);
        assert_eq!(book.best_bid_size(), 10.0);
        assert_eq!(book.best_ask_size(), 10.0);

        // Sort invariants: bids descending, asks ascending.
        assert!(book.bids.windows(2).all(|w| w[0].price >= w[1].price));
        assert!(book.asks.windows(2).all(|w| w[0].price <= w[1].price));

        // Best-of-book bounds every level.
        assert!(book.bids.iter().all(|l| l.price <= book.best_bid()));
        assert!(book.asks.iter().all(|l| l.price >= book.best_ask()));
    }

    #[test]
    fn test_empty_sides_defaults() {
        let value = serde_json::json!({"asset_id": "123"});
        let book = OrderBook::from_json(&value).unwrap();
        assert_eq!(book.best_bid(), 0.0);
        assert_eq!(book.best_ask(), 1.0);
        assert_eq!(book.best_bid_size(), 0.0);
        assert_eq!(book.best_ask_size(), 0.0);
    }

    #[test]
    fn test_missing_asset_id_rejected() {
        let value = serde_json::json!({"bids": [], "asks": []});
        assert!(OrderBook::from_json(&value).is_none());
    }

    #[test]
    fn test_numeric_timestamp() {
        let value = serde_json::json!({"asset_id": "1", "timestamp": 1700000000123u64});
        let book = OrderBook::from_json(&value).unwrap();
        assert_eq!(book.server_timestamp, 1700000000123);
    }
}
