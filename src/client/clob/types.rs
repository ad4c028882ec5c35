//! Core types for the CLOB API.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::order::Side;

// =============================================================================
// Order type
// =============================================================================

/// Time-in-force for submitted orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Good Till Cancel - standard limit order.
    #[default]
    Gtc,
    /// Fill or Kill - must execute completely or not at all.
    Fok,
    /// Good Till Date - limit order with expiration.
    Gtd,
    /// Fill and Kill (IOC) - partial fills allowed, remainder cancelled.
    Fak,
}

impl OrderType {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gtc => "GTC",
            Self::Fok => "FOK",
            Self::Gtd => "GTD",
            Self::Fak => "FAK",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// API credentials and auth headers
// =============================================================================

/// API key credentials for L2 authentication.
///
/// The secret is standard base64; it is decoded to raw bytes for HMAC
/// signing. Credentials are provisioned once per signing wallet via L1 and
/// persisted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCreds {
    /// API key identifier.
    pub api_key: String,
    /// Base64-encoded HMAC secret.
    pub api_secret: String,
    /// API passphrase.
    pub api_passphrase: String,
}

impl ApiKeyCreds {
    /// Creates credentials from their three parts.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_passphrase: api_passphrase.into(),
        }
    }
}

/// Raw credential payload returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRaw {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl From<ApiKeyRaw> for ApiKeyCreds {
    fn from(raw: ApiKeyRaw) -> Self {
        Self {
            api_key: raw.api_key,
            api_secret: raw.secret,
            api_passphrase: raw.passphrase,
        }
    }
}

/// L1 authentication headers (wallet EIP-712 signature).
///
/// Used to mint or derive API credentials.
#[derive(Debug, Clone)]
pub struct L1Headers {
    pub poly_address: String,
    pub poly_signature: String,
    pub poly_timestamp: String,
    pub poly_nonce: String,
}

impl L1Headers {
    /// Header map for the HTTP request.
    pub fn to_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("POLY_ADDRESS".to_string(), self.poly_address.clone());
        headers.insert("POLY_SIGNATURE".to_string(), self.poly_signature.clone());
        headers.insert("POLY_TIMESTAMP".to_string(), self.poly_timestamp.clone());
        headers.insert("POLY_NONCE".to_string(), self.poly_nonce.clone());
        headers
    }
}

/// L2 authentication headers (per-request HMAC).
#[derive(Debug, Clone)]
pub struct L2Headers {
    pub poly_address: String,
    pub poly_signature: String,
    pub poly_timestamp: String,
    pub poly_api_key: String,
    pub poly_passphrase: String,
}

impl L2Headers {
    /// Header map for the HTTP request.
    pub fn to_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("POLY_ADDRESS".to_string(), self.poly_address.clone());
        headers.insert("POLY_SIGNATURE".to_string(), self.poly_signature.clone());
        headers.insert("POLY_TIMESTAMP".to_string(), self.poly_timestamp.clone());
        headers.insert("POLY_API_KEY".to_string(), self.poly_api_key.clone());
        headers.insert("POLY_PASSPHRASE".to_string(), self.poly_passphrase.clone());
        headers
    }
}

// =============================================================================
// Markets
// =============================================================================

/// One outcome token of a binary market.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Token {
    #[serde(default)]
    pub token_id: String,
    /// "Yes" or "No".
    #[serde(default)]
    pub outcome: String,
}

/// A market as returned by the CLOB discovery endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Market {
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub market_slug: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    /// Selects the neg-risk exchange contract for EIP-712 signing.
    #[serde(default)]
    pub neg_risk: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
}

impl Market {
    /// Token ID of the YES outcome, if present.
    pub fn token_yes(&self) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.outcome == "Yes")
            .map(|t| t.token_id.as_str())
    }

    /// Token ID of the NO outcome, if present.
    pub fn token_no(&self) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.outcome == "No")
            .map(|t| t.token_id.as_str())
    }
}

/// One page of a cursor-paginated market listing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarketsPage {
    #[serde(default)]
    pub data: Vec<Market>,
    #[serde(default)]
    pub next_cursor: String,
}

/// Initial cursor for pagination.
pub const INITIAL_CURSOR: &str = "MA==";

/// End cursor indicating no more results.
pub const END_CURSOR: &str = "LTE=";

// =============================================================================
// Order lifecycle responses
// =============================================================================

/// Response for a posted order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "errorMsg")]
    pub error_msg: String,
    #[serde(default, rename = "orderID")]
    pub order_id: String,
    #[serde(default, rename = "transactionsHashes")]
    pub transaction_hashes: Vec<String>,
    #[serde(default)]
    pub status: String,
    /// Shares received.
    #[serde(default, rename = "takingAmount")]
    pub taking_amount: String,
    /// Collateral spent.
    #[serde(default, rename = "makingAmount")]
    pub making_amount: String,
    /// Request latency in milliseconds; filled by the client.
    #[serde(skip)]
    pub elapsed_ms: f64,
}

impl OrderResponse {
    /// A failed response carrying only an error message.
    pub fn failure(error_msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error_msg: error_msg.into(),
            ..Self::default()
        }
    }

    /// Parses a response body, folding transport status into the result.
    pub fn from_body(wire_ok: bool, status: u16, body: &str, error: Option<&str>) -> Self {
        let mut response: OrderResponse = serde_json::from_str(body).unwrap_or_default();
        if !wire_ok {
            response.success = false;
            if response.error_msg.is_empty() {
                response.error_msg = match error {
                    Some(e) if !e.is_empty() => e.to_string(),
                    _ => format!("http error: {}", status),
                };
            }
            if response.status.is_empty() {
                response.status = status.to_string();
            }
        }
        response
    }
}

/// An open (resting) order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenOrder {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub original_size: String,
    #[serde(default)]
    pub size_matched: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: serde_json::Value,
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub order_type: String,
}

/// A historical trade.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Trade {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub fee_rate_bps: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub match_time: String,
    #[serde(default)]
    pub transaction_hash: String,
}

// =============================================================================
// Order creation parameters
// =============================================================================

/// Parameters for a limit order.
#[derive(Debug, Clone)]
pub struct CreateOrderParams {
    /// Token ID (decimal string).
    pub token_id: String,
    /// Limit price.
    pub price: f64,
    /// Size in shares.
    pub size: f64,
    /// Order side.
    pub side: Side,
    /// Fee rate in basis points.
    pub fee_rate_bps: u64,
    /// Nonce for onchain cancellations.
    pub nonce: u64,
    /// Expiration timestamp (0 = none).
    pub expiration: u64,
    /// Skips the neg-risk probe when set.
    pub neg_risk: Option<bool>,
}

impl Default for CreateOrderParams {
    fn default() -> Self {
        Self {
            token_id: String::new(),
            price: 0.0,
            size: 0.0,
            side: Side::Buy,
            fee_rate_bps: 0,
            nonce: 0,
            expiration: 0,
            neg_risk: None,
        }
    }
}

/// Parameters for a market order.
#[derive(Debug, Clone)]
pub struct CreateMarketOrderParams {
    /// Token ID (decimal string).
    pub token_id: String,
    /// Collateral for BUY, shares for SELL.
    pub amount: f64,
    /// Order side.
    pub side: Side,
    /// Price limit; when absent the book is walked for a marketable price.
    pub price: Option<f64>,
    /// Time-in-force (FOK by default).
    pub order_type: OrderType,
    /// Fee rate in basis points; when absent it is fetched.
    pub fee_rate_bps: Option<u64>,
    /// Nonce for onchain cancellations.
    pub nonce: u64,
    /// Expiration timestamp (0 = none).
    pub expiration: u64,
    /// Taker address (zero = public order).
    pub taker: Option<Address>,
    /// Tick size; when absent it is fetched.
    pub tick_size: Option<super::order::TickSize>,
    /// Neg-risk flag; when absent it is fetched.
    pub neg_risk: Option<bool>,
    /// Demand all inputs up front; no resolution probes are issued.
    pub strict_no_fetch: bool,
}

impl Default for CreateMarketOrderParams {
    fn default() -> Self {
        Self {
            token_id: String::new(),
            amount: 0.0,
            side: Side::Buy,
            price: None,
            order_type: OrderType::Fok,
            fee_rate_bps: None,
            nonce: 0,
            expiration: 0,
            taker: None,
            tick_size: None,
            neg_risk: None,
            strict_no_fetch: false,
        }
    }
}

/// A signed order paired with its time-in-force for batch submission.
#[derive(Debug, Clone)]
pub struct BatchOrderEntry {
    pub order: super::order::SignedOrder,
    pub order_type: OrderType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_strings() {
        assert_eq!(OrderType::Gtc.as_str(), "GTC");
        assert_eq!(OrderType::Fok.as_str(), "FOK");
        assert_eq!(OrderType::Gtd.as_str(), "GTD");
        assert_eq!(OrderType::Fak.as_str(), "FAK");
    }

    #[test]
    fn test_api_key_raw_conversion() {
        let raw: ApiKeyRaw = serde_json::from_str(
            r#"{"apiKey":"key-1","secret":"c2VjcmV0","passphrase":"pass"}"#,
        )
        .unwrap();
        let creds: ApiKeyCreds = raw.into();
        assert_eq!(creds.api_key, "key-1");
        assert_eq!(creds.api_secret, "c2VjcmV0");
        assert_eq!(creds.api_passphrase, "pass");
    }

    #[test]
    fn test_l1_headers_map() {
        let headers = L1Headers {
            poly_address: "0xabc".into(),
            poly_signature: "0xsig".into(),
            poly_timestamp: "1700000000".into(),
            poly_nonce: "0".into(),
        };
        let map = headers.to_headers();
        assert_eq!(map.len(), 4);
        assert_eq!(map["POLY_NONCE"], "0");
        assert!(!map.contains_key("POLY_API_KEY"));
    }

    #[test]
    fn test_l2_headers_map() {
        let headers = L2Headers {
            poly_address: "0xabc".into(),
            poly_signature: "sig".into(),
            poly_timestamp: "1700000000".into(),
            poly_api_key: "key".into(),
            poly_passphrase: "pass".into(),
        };
        let map = headers.to_headers();
        assert_eq!(map.len(), 5);
        assert!(map.contains_key("POLY_API_KEY"));
        assert!(map.contains_key("POLY_PASSPHRASE"));
        assert!(!map.contains_key("POLY_NONCE"));
    }

    #[test]
    fn test_market_outcome_lookup() {
        let market: Market = serde_json::from_str(
            r#"{
                "condition_id": "0xcond",
                "tokens": [
                    {"token_id": "111", "outcome": "Yes"},
                    {"token_id": "222", "outcome": "No"}
                ],
                "neg_risk": true,
                "active": true,
                "closed": false
            }"#,
        )
        .unwrap();
        assert_eq!(market.token_yes(), Some("111"));
        assert_eq!(market.token_no(), Some("222"));
        assert!(market.neg_risk);
    }

    #[test]
    fn test_order_response_from_error_body() {
        let response = OrderResponse::from_body(false, 400, r#"{"errorMsg":"bad order"}"#, None);
        assert!(!response.success);
        assert_eq!(response.error_msg, "bad order");
        assert_eq!(response.status, "400");
    }

    #[test]
    fn test_order_response_from_transport_failure() {
        let response = OrderResponse::from_body(false, 0, "", Some("timeout"));
        assert!(!response.success);
        assert_eq!(response.error_msg, "timeout");
    }

    #[test]
    fn test_order_response_success() {
        let response = OrderResponse::from_body(
            true,
            200,
            r#"{"success":true,"orderID":"0xoid","status":"matched"}"#,
            None,
        );
        assert!(response.success);
        assert_eq!(response.order_id, "0xoid");
    }
}
