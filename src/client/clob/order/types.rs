//! Order types for the CTF exchange.
//!
//! Defines the EIP-712 `Order` struct, the signed-order wire form, and the
//! side / signature-type enums.

use alloy_primitives::U256;
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};

// =============================================================================
// Side
// =============================================================================

/// Order side (BUY or SELL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Side {
    /// Buy order (0).
    #[default]
    #[serde(rename = "BUY")]
    Buy = 0,
    /// Sell order (1).
    #[serde(rename = "SELL")]
    Sell = 1,
}

impl Side {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(format!("invalid side: '{}'. Valid options: BUY, SELL", s)),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side as u8
    }
}

// =============================================================================
// SignatureType
// =============================================================================

/// Wallet scheme the order signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SignatureType {
    /// ECDSA EIP-712 signature from an EOA.
    #[default]
    Eoa = 0,
    /// EOA signature on behalf of a Polymarket proxy wallet.
    PolyProxy = 1,
    /// EOA signature on behalf of a Polymarket Gnosis Safe.
    PolyGnosisSafe = 2,
}

impl From<SignatureType> for u8 {
    fn from(sig_type: SignatureType) -> Self {
        sig_type as u8
    }
}

// =============================================================================
// EIP-712 Order struct
// =============================================================================

sol! {
    /// EIP-712 Order struct for the CTF exchange.
    #[derive(Debug, PartialEq, Eq)]
    struct Order {
        /// Unique salt for entropy.
        uint256 salt;
        /// Maker address (source of funds).
        address maker;
        /// Signing EOA.
        address signer;
        /// Taker address (zero = public order).
        address taker;
        /// Token ID of the CTF ERC1155 asset.
        uint256 tokenId;
        /// Maker amount (max tokens to sell).
        uint256 makerAmount;
        /// Taker amount (min tokens to receive).
        uint256 takerAmount;
        /// Expiration timestamp (0 = no expiration).
        uint256 expiration;
        /// Nonce for onchain cancellations.
        uint256 nonce;
        /// Fee rate in basis points.
        uint256 feeRateBps;
        /// Order side (0=BUY, 1=SELL).
        uint8 side;
        /// Signature type (0=EOA, 1=proxy, 2=safe).
        uint8 signatureType;
    }
}

// =============================================================================
// SignedOrder
// =============================================================================

/// An order together with its 65-byte `r || s || v` signature.
#[derive(Debug, Clone)]
pub struct SignedOrder {
    /// The signed order fields.
    pub order: Order,
    /// Signature as 0x-prefixed hex (132 characters).
    pub signature: String,
}

impl SignedOrder {
    /// Wraps an order with its raw signature bytes.
    pub fn new(order: Order, signature: Vec<u8>) -> Self {
        Self {
            order,
            signature: format!("0x{}", hex::encode(signature)),
        }
    }

    /// Order side decoded from the struct field.
    pub fn side(&self) -> Side {
        if self.order.side == 0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// Serializes to the wire schema the order endpoint expects.
    ///
    /// Field order is preserved; `salt` is a JSON integer while the
    /// remaining numeric fields travel as decimal strings, and addresses are
    /// EIP-55 checksummed.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "salt": self.order.salt.to::<u64>(),
            "maker": self.order.maker.to_checksum(None),
            "signer": self.order.signer.to_checksum(None),
            "taker": self.order.taker.to_checksum(None),
            "tokenId": self.order.tokenId.to_string(),
            "makerAmount": self.order.makerAmount.to_string(),
            "takerAmount": self.order.takerAmount.to_string(),
            "side": self.side().as_str(),
            "expiration": self.order.expiration.to_string(),
            "nonce": self.order.nonce.to_string(),
            "feeRateBps": self.order.feeRateBps.to_string(),
            "signatureType": self.order.signatureType,
            "signature": self.signature,
        })
    }
}

/// Convenience constructor for a `U256` token id from its decimal string.
pub fn parse_token_id(token_id: &str) -> crate::error::Result<U256> {
    token_id
        .parse::<U256>()
        .map_err(|e| crate::error::ClobError::other(format!("invalid token id '{}': {}", token_id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn sample_order() -> Order {
        Order {
            salt: U256::from(123456789u64),
            maker: Address::ZERO,
            signer: Address::ZERO,
            taker: Address::ZERO,
            tokenId: U256::from(1234567890u64),
            makerAmount: U256::from(1_000_000u64),
            takerAmount: U256::from(2_000_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            feeRateBps: U256::ZERO,
            side: 0,
            signatureType: 2,
        }
    }

    #[test]
    fn test_side_values() {
        assert_eq!(u8::from(Side::Buy), 0);
        assert_eq!(u8::from(Side::Sell), 1);
        assert_eq!(Side::Buy.as_str(), "BUY");
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn test_signature_type_values() {
        assert_eq!(u8::from(SignatureType::Eoa), 0);
        assert_eq!(u8::from(SignatureType::PolyProxy), 1);
        assert_eq!(u8::from(SignatureType::PolyGnosisSafe), 2);
    }

    #[test]
    fn test_signed_order_wire_schema() {
        let signed = SignedOrder::new(sample_order(), vec![0u8; 65]);
        let json = signed.to_json();

        // salt must travel as an integer, not a string
        assert!(json["salt"].is_u64());
        assert_eq!(json["salt"], 123456789u64);

        assert_eq!(json["side"], "BUY");
        assert_eq!(json["makerAmount"], "1000000");
        assert_eq!(json["takerAmount"], "2000000");
        assert_eq!(json["signatureType"], 2);
        assert_eq!(json["signature"].as_str().unwrap().len(), 132);

        // field order is part of the wire contract
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "salt",
                "maker",
                "signer",
                "taker",
                "tokenId",
                "makerAmount",
                "takerAmount",
                "side",
                "expiration",
                "nonce",
                "feeRateBps",
                "signatureType",
                "signature"
            ]
        );
    }

    #[test]
    fn test_parse_token_id() {
        assert_eq!(parse_token_id("1234567890").unwrap(), U256::from(1234567890u64));
        // 256-bit identifiers exceed u64
        let big = "21742633143463906290569050155826241533067272736897614950488156847949938836455";
        assert!(parse_token_id(big).is_ok());
        assert!(parse_token_id("not-a-number").is_err());
    }
}
