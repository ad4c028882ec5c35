//! Protocol constants for order signing.
//!
//! Contract addresses, EIP-712 domain parameters, and token decimals.

use alloy_primitives::{address, Address};

use crate::error::{ClobError, Result};

// =============================================================================
// EIP-712 Protocol Constants
// =============================================================================

/// Protocol name for the exchange EIP-712 domain.
pub const PROTOCOL_NAME: &str = "Polymarket CTF Exchange";

/// Protocol version for the exchange EIP-712 domain.
pub const PROTOCOL_VERSION: &str = "1";

/// Order type string hashed into the EIP-712 struct hash.
pub const ORDER_TYPE: &str = "Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)";

/// Polygon mainnet chain ID.
pub const POLYGON_CHAIN_ID: u64 = 137;

// =============================================================================
// Token Decimals
// =============================================================================

/// Collateral token decimals (USDC).
pub const COLLATERAL_TOKEN_DECIMALS: u32 = 6;

// =============================================================================
// Contract Addresses (Polygon mainnet)
// =============================================================================

/// CTF Exchange contract.
pub const EXCHANGE_ADDRESS: Address = address!("4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E");

/// Negative-risk CTF Exchange contract.
pub const NEG_RISK_EXCHANGE_ADDRESS: Address = address!("C5d563A36AE78145C45a50134d48A1215220f80a");

/// Verifying contract for the given chain and market flavor.
///
/// Negative-risk markets clear against a different exchange contract, which
/// changes the EIP-712 domain separator.
pub fn get_exchange_address(chain_id: u64, neg_risk: bool) -> Result<Address> {
    if chain_id != POLYGON_CHAIN_ID {
        return Err(ClobError::other(format!(
            "unsupported chain id: {} (expected {})",
            chain_id, POLYGON_CHAIN_ID
        )));
    }
    Ok(if neg_risk {
        NEG_RISK_EXCHANGE_ADDRESS
    } else {
        EXCHANGE_ADDRESS
    })
}
