//! EIP-712 hashing and signing.
//!
//! Covers both typed-data domains the exchange uses: the order domain
//! (four fields, verifying contract selected by the market's neg-risk flag)
//! and the auth domain (three fields, no verifying contract).

use alloy_primitives::{keccak256, Address, Signature, B256, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{eip712_domain, Eip712Domain, SolStruct};

use super::constants::{PROTOCOL_NAME, PROTOCOL_VERSION};
use super::types::Order;
use crate::error::{ClobError, Result};

/// Domain name for the auth challenge.
pub const AUTH_DOMAIN_NAME: &str = "ClobAuthDomain";

/// Domain version for the auth challenge.
pub const AUTH_DOMAIN_VERSION: &str = "1";

/// Attestation message embedded in the auth challenge.
pub const AUTH_MESSAGE: &str = "This message attests that I control the given wallet";

/// ClobAuth type string hashed into the struct hash.
const CLOB_AUTH_TYPE: &str = "ClobAuth(address address,string timestamp,uint256 nonce,string message)";

// =============================================================================
// Domains
// =============================================================================

/// EIP-712 domain for order signing.
pub fn build_order_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: PROTOCOL_NAME,
        version: PROTOCOL_VERSION,
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// EIP-712 domain for the auth challenge (no verifying contract).
pub fn build_auth_domain(chain_id: u64) -> Eip712Domain {
    eip712_domain! {
        name: AUTH_DOMAIN_NAME,
        version: AUTH_DOMAIN_VERSION,
        chain_id: chain_id,
    }
}

// =============================================================================
// Order hashing and signing
// =============================================================================

/// EIP-712 signing hash of an order:
/// `keccak256(0x1901 || domainSeparator || structHash)`.
pub fn hash_order(order: &Order, chain_id: u64, verifying_contract: Address) -> B256 {
    let domain = build_order_domain(chain_id, verifying_contract);
    order.eip712_signing_hash(&domain)
}

/// Signs an order for the given verifying contract.
///
/// Returns the 65-byte `r || s || v` signature with `v` normalized to 27/28.
pub async fn sign_order(
    signer: &PrivateKeySigner,
    order: &Order,
    chain_id: u64,
    verifying_contract: Address,
) -> Result<Vec<u8>> {
    let hash = hash_order(order, chain_id, verifying_contract);
    sign_digest(signer, hash).await
}

/// Signs a prehashed EIP-712 digest, normalizing the recovery byte.
pub async fn sign_digest(signer: &PrivateKeySigner, digest: B256) -> Result<Vec<u8>> {
    let signature = signer
        .sign_hash(&digest)
        .await
        .map_err(|e| ClobError::crypto(format!("failed to sign digest: {}", e)))?;

    let mut bytes = signature.as_bytes().to_vec();
    if bytes.len() == 65 && bytes[64] < 27 {
        bytes[64] += 27;
    }
    Ok(bytes)
}

/// Recovers the signing address from an order signature.
pub fn recover_order_signer(
    order: &Order,
    signature: &[u8],
    chain_id: u64,
    verifying_contract: Address,
) -> Result<Address> {
    if signature.len() != 65 {
        return Err(ClobError::crypto("invalid signature length"));
    }

    let hash = hash_order(order, chain_id, verifying_contract);

    let mut normalized = signature.to_vec();
    if normalized[64] >= 27 {
        normalized[64] -= 27;
    }

    let signature = Signature::try_from(normalized.as_slice())
        .map_err(|e| ClobError::crypto(format!("invalid signature: {}", e)))?;

    signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| ClobError::crypto(format!("failed to recover address: {}", e)))
}

// =============================================================================
// ClobAuth hashing
// =============================================================================

/// Struct hash of the auth challenge.
///
/// The `address` field is the signing EOA, never the funder; `timestamp` and
/// the attestation message are hashed as UTF-8 strings per EIP-712.
pub fn hash_clob_auth(address: Address, timestamp: &str, nonce: u64) -> B256 {
    let mut encoded = Vec::with_capacity(160);
    encoded.extend_from_slice(keccak256(CLOB_AUTH_TYPE.as_bytes()).as_slice());
    encoded.extend_from_slice(B256::left_padding_from(address.as_slice()).as_slice());
    encoded.extend_from_slice(keccak256(timestamp.as_bytes()).as_slice());
    encoded.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
    encoded.extend_from_slice(keccak256(AUTH_MESSAGE.as_bytes()).as_slice());
    keccak256(&encoded)
}

/// EIP-712 signing hash of the auth challenge.
pub fn auth_signing_hash(address: Address, timestamp: &str, nonce: u64, chain_id: u64) -> B256 {
    let domain = build_auth_domain(chain_id);
    let struct_hash = hash_clob_auth(address, timestamp, nonce);

    let mut encoded = Vec::with_capacity(66);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(domain.hash_struct().as_slice());
    encoded.extend_from_slice(struct_hash.as_slice());
    keccak256(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample_order(signer: Address) -> Order {
        Order {
            salt: U256::from(12345u64),
            maker: signer,
            signer,
            taker: Address::ZERO,
            tokenId: U256::from(1u64),
            makerAmount: U256::from(1_000_000u64),
            takerAmount: U256::from(500_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            feeRateBps: U256::from(100u64),
            side: 0,
            signatureType: 0,
        }
    }

    #[test]
    fn test_build_order_domain() {
        let contract = address!("4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E");
        let domain = build_order_domain(137, contract);
        assert_eq!(domain.chain_id, Some(U256::from(137)));
        assert_eq!(domain.verifying_contract, Some(contract));
    }

    #[test]
    fn test_auth_domain_has_no_verifying_contract() {
        let domain = build_auth_domain(137);
        assert_eq!(domain.chain_id, Some(U256::from(137)));
        assert!(domain.verifying_contract.is_none());
    }

    #[test]
    fn test_hash_order_depends_on_contract() {
        let order = sample_order(Address::ZERO);
        let standard = hash_order(
            &order,
            137,
            address!("4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E"),
        );
        let neg_risk = hash_order(
            &order,
            137,
            address!("C5d563A36AE78145C45a50134d48A1215220f80a"),
        );
        assert_ne!(standard, neg_risk);
    }

    #[test]
    fn test_auth_struct_hash_varies_with_inputs() {
        let addr = Address::ZERO;
        let a = hash_clob_auth(addr, "1700000000", 0);
        let b = hash_clob_auth(addr, "1700000001", 0);
        let c = hash_clob_auth(addr, "1700000000", 1);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_sign_order_recovers_signer() {
        let signer = PrivateKeySigner::random();
        let order = sample_order(signer.address());
        let contract = address!("4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E");

        let signature = sign_order(&signer, &order, 137, contract).await.unwrap();
        assert_eq!(signature.len(), 65);
        assert!(signature[64] == 27 || signature[64] == 28);

        let recovered = recover_order_signer(&order, &signature, 137, contract).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let signer = PrivateKeySigner::random();
        let order = sample_order(signer.address());
        let contract = address!("C5d563A36AE78145C45a50134d48A1215220f80a");

        let first = sign_order(&signer, &order, 137, contract).await.unwrap();
        let second = sign_order(&signer, &order, 137, contract).await.unwrap();
        assert_eq!(first, second);
    }
}
