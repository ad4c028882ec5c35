//! Two-tier authentication header generation.
//!
//! L1 signs an EIP-712 auth challenge with the wallet and is used to mint or
//! derive API credentials. L2 signs each request with HMAC-SHA256 over
//! `timestamp || method || path || body` under the decoded API secret.
//!
//! Both levels take an optional timestamp override so signatures are
//! deterministic under test.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use base64::engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE as BASE64_URL_SAFE};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::trace;

use super::order::eip712::{auth_signing_hash, sign_digest};
use super::types::{ApiKeyCreds, L1Headers, L2Headers};
use crate::error::{ClobError, Result};

/// Current UNIX time in whole seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs()
}

// =============================================================================
// L1 (wallet signature)
// =============================================================================

/// Builds L1 headers by signing the auth challenge with the wallet.
///
/// The attested address is always the signing EOA, never the funder, even in
/// proxy-wallet mode.
pub async fn create_l1_headers(
    wallet: &PrivateKeySigner,
    chain_id: u64,
    nonce: Option<u64>,
    timestamp: Option<String>,
) -> Result<L1Headers> {
    let timestamp = timestamp.unwrap_or_else(|| unix_timestamp().to_string());
    let nonce = nonce.unwrap_or(0);
    let address: Address = wallet.address();

    let digest = auth_signing_hash(address, &timestamp, nonce, chain_id);
    let signature = sign_digest(wallet, digest).await?;

    trace!(address = %address, timestamp = %timestamp, nonce, "built L1 auth headers");

    Ok(L1Headers {
        poly_address: address.to_checksum(None),
        poly_signature: format!("0x{}", hex::encode(signature)),
        poly_timestamp: timestamp,
        poly_nonce: nonce.to_string(),
    })
}

// =============================================================================
// L2 (HMAC)
// =============================================================================

/// Computes the URL-safe base64 HMAC signature for one request.
///
/// `path` is the logical endpoint path without any query string; an empty
/// body contributes nothing to the message.
pub fn sign_l2_request(
    secret_base64: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String> {
    let secret = BASE64_STANDARD
        .decode(secret_base64)
        .or_else(|_| BASE64_URL_SAFE.decode(secret_base64))
        .map_err(|e| ClobError::Base64Parse(e.to_string()))?;

    let mut message = String::with_capacity(timestamp.len() + method.len() + path.len() + body.len());
    message.push_str(timestamp);
    message.push_str(method);
    message.push_str(path);
    message.push_str(body);

    let mut mac = Hmac::<Sha256>::new_from_slice(&secret)
        .map_err(|e| ClobError::crypto(format!("hmac key: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(BASE64_URL_SAFE.encode(mac.finalize().into_bytes()))
}

/// Builds the five L2 headers for an authenticated request.
pub fn create_l2_headers(
    address: Address,
    creds: &ApiKeyCreds,
    method: &str,
    path: &str,
    body: Option<&str>,
    timestamp: Option<String>,
) -> Result<L2Headers> {
    let timestamp = timestamp.unwrap_or_else(|| unix_timestamp().to_string());
    let signature = sign_l2_request(
        &creds.api_secret,
        &timestamp,
        method,
        path,
        body.unwrap_or(""),
    )?;

    trace!(method, path, timestamp = %timestamp, "built L2 auth headers");

    Ok(L2Headers {
        poly_address: address.to_checksum(None),
        poly_signature: signature,
        poly_timestamp: timestamp,
        poly_api_key: creds.api_key.clone(),
        poly_passphrase: creds.api_passphrase.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_timestamp_sane() {
        // After 2020.
        assert!(unix_timestamp() > 1_577_836_800);
    }

    #[test]
    fn test_l2_signature_reference_vector() {
        // secret "dGVzdHNlY3JldA==" decodes to "testsecret"; message is
        // "1700000000POST/order{}".
        let signature =
            sign_l2_request("dGVzdHNlY3JldA==", "1700000000", "POST", "/order", "{}").unwrap();
        assert_eq!(signature, "IA11ouH10kxd7fpV4wSldOtb-tGnZx1a8oFsH0fkT2A=");
    }

    #[test]
    fn test_l2_signature_is_url_safe() {
        // The reference vector digest contains byte patterns that standard
        // base64 renders with '+'; the URL-safe alphabet must be used.
        let signature =
            sign_l2_request("dGVzdHNlY3JldA==", "1700000000", "POST", "/order", "{}").unwrap();
        assert!(!signature.contains('+'));
        assert!(!signature.contains('/'));
        assert!(signature.contains('-') || signature.contains('_'));
    }

    #[test]
    fn test_l2_same_inputs_same_signature() {
        let creds = ApiKeyCreds::new("key", "dGVzdHNlY3JldA==", "pass");
        let a = create_l2_headers(
            Address::ZERO,
            &creds,
            "GET",
            "/data/orders",
            None,
            Some("1700000000".into()),
        )
        .unwrap();
        let b = create_l2_headers(
            Address::ZERO,
            &creds,
            "GET",
            "/data/orders",
            None,
            Some("1700000000".into()),
        )
        .unwrap();
        assert_eq!(a.poly_signature, b.poly_signature);
    }

    #[test]
    fn test_l2_empty_body_contributes_nothing() {
        let with_none =
            sign_l2_request("dGVzdHNlY3JldA==", "1700000000", "GET", "/orders", "").unwrap();
        let creds = ApiKeyCreds::new("key", "dGVzdHNlY3JldA==", "pass");
        let headers = create_l2_headers(
            Address::ZERO,
            &creds,
            "GET",
            "/orders",
            None,
            Some("1700000000".into()),
        )
        .unwrap();
        assert_eq!(headers.poly_signature, with_none);
    }

    #[test]
    fn test_l2_invalid_secret() {
        let result = sign_l2_request("!!!", "1700000000", "GET", "/orders", "");
        assert!(matches!(result, Err(ClobError::Base64Parse(_))));
    }

    #[tokio::test]
    async fn test_l1_headers_attest_signer_address() {
        let wallet = PrivateKeySigner::random();
        let headers = create_l1_headers(&wallet, 137, None, Some("1700000000".into()))
            .await
            .unwrap();
        assert_eq!(headers.poly_address, wallet.address().to_checksum(None));
        assert_eq!(headers.poly_timestamp, "1700000000");
        assert_eq!(headers.poly_nonce, "0");
        // 65-byte signature as 0x-prefixed hex.
        assert_eq!(headers.poly_signature.len(), 132);
    }

    #[tokio::test]
    async fn test_l1_nonce_changes_signature() {
        let wallet = PrivateKeySigner::random();
        let a = create_l1_headers(&wallet, 137, Some(0), Some("1700000000".into()))
            .await
            .unwrap();
        let b = create_l1_headers(&wallet, 137, Some(1), Some("1700000000".into()))
            .await
            .unwrap();
        assert_ne!(a.poly_signature, b.poly_signature);
        assert_eq!(b.poly_nonce, "1");
    }
}
