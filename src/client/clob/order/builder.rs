//! Exchange order builder.
//!
//! Holds the signing wallet, chain, signature scheme, and optional funder
//! address, and turns base-unit order arguments into signed orders.

use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;

use super::constants::get_exchange_address;
use super::eip712::sign_order;
use super::types::{Order, Side, SignatureType, SignedOrder};
use super::units::generate_salt;
use crate::error::{ClobError, Result};

/// Order arguments with amounts already converted to base units.
#[derive(Debug, Clone)]
pub struct OrderArgs {
    /// Token ID of the CTF ERC1155 asset to trade.
    pub token_id: U256,
    /// Maker amount in base units.
    pub maker_amount: U256,
    /// Taker amount in base units.
    pub taker_amount: U256,
    /// Order side.
    pub side: Side,
    /// Taker address (zero = public order).
    pub taker: Address,
    /// Fee rate in basis points.
    pub fee_rate_bps: U256,
    /// Nonce for onchain cancellations.
    pub nonce: U256,
    /// Expiration timestamp (0 = no expiration).
    pub expiration: U256,
}

impl Default for OrderArgs {
    fn default() -> Self {
        Self {
            token_id: U256::ZERO,
            maker_amount: U256::ZERO,
            taker_amount: U256::ZERO,
            side: Side::Buy,
            taker: Address::ZERO,
            fee_rate_bps: U256::ZERO,
            nonce: U256::ZERO,
            expiration: U256::ZERO,
        }
    }
}

/// Builder for signed CTF exchange orders.
///
/// The maker is the funder when one is configured (proxy and Safe wallets),
/// otherwise the signing EOA; the signer field is always the EOA.
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    signer: PrivateKeySigner,
    chain_id: u64,
    signature_type: SignatureType,
    funder: Option<Address>,
}

impl OrderBuilder {
    /// Creates a builder around an existing wallet.
    pub fn new(
        signer: PrivateKeySigner,
        chain_id: u64,
        signature_type: Option<SignatureType>,
        funder: Option<Address>,
    ) -> Self {
        Self {
            signer,
            chain_id,
            signature_type: signature_type.unwrap_or_default(),
            funder,
        }
    }

    /// Creates a builder from a hex private key.
    pub fn from_private_key(
        private_key: &str,
        chain_id: u64,
        signature_type: Option<SignatureType>,
        funder: Option<Address>,
    ) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ClobError::InvalidPrivateKey(format!("{}", e)))?;
        Ok(Self::new(signer, chain_id, signature_type, funder))
    }

    /// The signing EOA address.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// The funds-holding address (funder when set, else the EOA).
    pub fn maker_address(&self) -> Address {
        self.funder.unwrap_or_else(|| self.signer.address())
    }

    /// The configured signature type.
    pub fn signature_type(&self) -> SignatureType {
        self.signature_type
    }

    /// The chain the builder signs for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Borrow of the signing wallet.
    pub fn wallet(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Assembles the order struct with a fresh salt.
    pub fn build_order(&self, args: &OrderArgs) -> Order {
        self.build_order_with_salt(args, generate_salt())
    }

    /// Assembles the order struct with a caller-supplied salt, for
    /// deterministic signatures.
    pub fn build_order_with_salt(&self, args: &OrderArgs, salt: u64) -> Order {
        Order {
            salt: U256::from(salt),
            maker: self.maker_address(),
            signer: self.signer.address(),
            taker: args.taker,
            tokenId: args.token_id,
            makerAmount: args.maker_amount,
            takerAmount: args.taker_amount,
            expiration: args.expiration,
            nonce: args.nonce,
            feeRateBps: args.fee_rate_bps,
            side: args.side as u8,
            signatureType: self.signature_type as u8,
        }
    }

    /// Builds and signs an order against the exchange contract the market's
    /// neg-risk flag selects.
    pub async fn build_signed_order(&self, args: &OrderArgs, neg_risk: bool) -> Result<SignedOrder> {
        self.build_signed_order_with_salt(args, neg_risk, generate_salt())
            .await
    }

    /// Builds and signs an order with a caller-supplied salt.
    pub async fn build_signed_order_with_salt(
        &self,
        args: &OrderArgs,
        neg_risk: bool,
        salt: u64,
    ) -> Result<SignedOrder> {
        let order = self.build_order_with_salt(args, salt);
        let contract = get_exchange_address(self.chain_id, neg_risk)?;
        let signature = sign_order(&self.signer, &order, self.chain_id, contract).await?;
        Ok(SignedOrder::new(order, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> OrderArgs {
        OrderArgs {
            token_id: U256::from(12345u64),
            maker_amount: U256::from(1_000_000u64),
            taker_amount: U256::from(500_000u64),
            side: Side::Buy,
            fee_rate_bps: U256::from(100u64),
            ..OrderArgs::default()
        }
    }

    #[test]
    fn test_builder_defaults() {
        let signer = PrivateKeySigner::random();
        let builder = OrderBuilder::new(signer.clone(), 137, None, None);
        assert_eq!(builder.chain_id(), 137);
        assert_eq!(builder.signature_type(), SignatureType::Eoa);
        assert_eq!(builder.signer_address(), signer.address());
        assert_eq!(builder.maker_address(), signer.address());
    }

    #[test]
    fn test_builder_with_funder() {
        let signer = PrivateKeySigner::random();
        let funder = Address::repeat_byte(1);
        let builder = OrderBuilder::new(
            signer.clone(),
            137,
            Some(SignatureType::PolyGnosisSafe),
            Some(funder),
        );
        assert_eq!(builder.maker_address(), funder);
        assert_eq!(builder.signer_address(), signer.address());
        assert_eq!(builder.signature_type(), SignatureType::PolyGnosisSafe);
    }

    #[test]
    fn test_invalid_private_key() {
        let result = OrderBuilder::from_private_key("0xnot-a-key", 137, None, None);
        assert!(matches!(result, Err(ClobError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_build_order_fields() {
        let signer = PrivateKeySigner::random();
        let builder = OrderBuilder::new(signer.clone(), 137, None, None);
        let order = builder.build_order_with_salt(&sample_args(), 42);

        assert_eq!(order.salt, U256::from(42u64));
        assert_eq!(order.maker, signer.address());
        assert_eq!(order.signer, signer.address());
        assert_eq!(order.taker, Address::ZERO);
        assert_eq!(order.tokenId, U256::from(12345u64));
        assert_eq!(order.side, 0);
        assert_eq!(order.signatureType, 0);
    }

    #[tokio::test]
    async fn test_build_signed_order() {
        let signer = PrivateKeySigner::random();
        let builder = OrderBuilder::new(signer, 137, None, None);

        let signed = builder.build_signed_order(&sample_args(), false).await.unwrap();
        assert!(signed.signature.starts_with("0x"));
        assert_eq!(signed.signature.len(), 132);
    }

    #[tokio::test]
    async fn test_salt_override_is_deterministic() {
        let signer = PrivateKeySigner::random();
        let builder = OrderBuilder::new(signer, 137, None, None);
        let args = sample_args();

        let first = builder
            .build_signed_order_with_salt(&args, true, 7)
            .await
            .unwrap();
        let second = builder
            .build_signed_order_with_salt(&args, true, 7)
            .await
            .unwrap();
        assert_eq!(first.signature, second.signature);
    }
}
