//! Authenticated trading: credential provisioning, the order lifecycle, and
//! the market-order resolution pipeline.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde_json::json;
use tracing::{debug, instrument, trace};

use super::auth::{create_l1_headers, create_l2_headers};
use super::order::builder::{OrderArgs, OrderBuilder};
use super::order::rounding::{derive_market_amounts, get_round_config, validate_price, TickSize};
use super::order::types::parse_token_id;
use super::order::units::to_base_units;
use super::order::{Side, SignedOrder};
use super::types::{
    ApiKeyCreds, ApiKeyRaw, BatchOrderEntry, CreateMarketOrderParams, CreateOrderParams, OpenOrder,
    OrderResponse, OrderType, Trade,
};
use super::Client;
use crate::client::http::AsyncEngine;
use crate::error::{ClobError, Result};

/// Logical endpoint paths. L2 signatures are computed over these; query
/// strings are appended to the outbound URL only.
mod endpoints {
    pub const POST_ORDER: &str = "/order";
    pub const POST_ORDERS: &str = "/orders";
    pub const GET_ORDER: &str = "/order/";
    pub const GET_OPEN_ORDERS: &str = "/orders";
    pub const GET_TRADES: &str = "/trades";
    pub const CANCEL_ORDER: &str = "/order";
    pub const CANCEL_ORDERS: &str = "/orders";
    pub const CANCEL_ALL: &str = "/cancel-all";
    pub const CANCEL_MARKET_ORDERS: &str = "/cancel-market-orders";
    pub const CREATE_API_KEY: &str = "/auth/api-key";
    pub const DERIVE_API_KEY: &str = "/auth/derive-api-key";
}

/// Resolved inputs for a market order.
#[derive(Debug, Clone, Copy)]
struct ResolvedInputs {
    tick_size: TickSize,
    price: f64,
    neg_risk: bool,
    fee_rate_bps: u64,
}

/// Authenticated CLOB client.
///
/// Wraps the public [`Client`] with a signing wallet and, once provisioned,
/// API credentials. Cloning shares the transport and async engine.
#[derive(Clone)]
pub struct TradingClient {
    inner: Client,
    builder: OrderBuilder,
    creds: Option<ApiKeyCreds>,
    engine: AsyncEngine,
}

impl TradingClient {
    /// Creates a trading client over an existing public client.
    pub fn new(client: Client, builder: OrderBuilder) -> Self {
        let engine = AsyncEngine::new(client.transport());
        Self {
            inner: client,
            builder,
            creds: None,
            engine,
        }
    }

    /// Attaches API credentials for L2 endpoints.
    pub fn with_creds(mut self, creds: ApiKeyCreds) -> Self {
        self.creds = Some(creds);
        self
    }

    /// The public client (shared transport).
    pub fn client(&self) -> &Client {
        &self.inner
    }

    /// The order builder in use.
    pub fn order_builder(&self) -> &OrderBuilder {
        &self.builder
    }

    /// The fire-and-forget request engine bound to this client's transport.
    pub fn async_engine(&self) -> &AsyncEngine {
        &self.engine
    }

    /// Waits up to `timeout` for async completions.
    pub async fn poll_async(&self, timeout: std::time::Duration) -> usize {
        self.engine.poll_async(timeout).await
    }

    /// Async requests still in flight.
    pub fn pending_async(&self) -> usize {
        self.engine.pending_async()
    }

    /// The signing EOA address.
    pub fn address(&self) -> Address {
        self.builder.signer_address()
    }

    /// The funds-holding address.
    pub fn funder_address(&self) -> Address {
        self.builder.maker_address()
    }

    /// Whether L2 endpoints are usable.
    pub fn is_authenticated(&self) -> bool {
        self.creds.is_some()
    }

    fn creds(&self) -> Result<&ApiKeyCreds> {
        self.creds.as_ref().ok_or(ClobError::NotAuthenticated)
    }

    /// L2 headers over the logical path (query strings excluded).
    fn l2_headers(
        &self,
        method: &str,
        logical_path: &str,
        body: Option<&str>,
    ) -> Result<HashMap<String, String>> {
        let creds = self.creds()?;
        let headers = create_l2_headers(
            self.builder.signer_address(),
            creds,
            method,
            logical_path,
            body,
            None,
        )?;
        Ok(headers.to_headers())
    }

    // =========================================================================
    // API key management (L1)
    // =========================================================================

    /// Mints a new API key with a wallet signature.
    #[instrument(skip(self), level = "trace")]
    pub async fn create_api_key(&self, nonce: Option<u64>) -> Result<ApiKeyCreds> {
        let headers = create_l1_headers(self.builder.wallet(), self.builder.chain_id(), nonce, None)
            .await?
            .to_headers();

        let response = self
            .inner
            .transport()
            .post(endpoints::CREATE_API_KEY, "{}", Some(&headers))
            .await;
        let body = Client::check(response)?;
        let raw: ApiKeyRaw = serde_json::from_str(&body)?;
        debug!("API key created");
        Ok(raw.into())
    }

    /// Re-derives the API key previously minted for this wallet and nonce.
    #[instrument(skip(self), level = "trace")]
    pub async fn derive_api_key(&self, nonce: Option<u64>) -> Result<ApiKeyCreds> {
        let headers = create_l1_headers(self.builder.wallet(), self.builder.chain_id(), nonce, None)
            .await?
            .to_headers();

        let response = self
            .inner
            .transport()
            .get(endpoints::DERIVE_API_KEY, Some(&headers))
            .await;
        let body = Client::check(response)?;
        let raw: ApiKeyRaw = serde_json::from_str(&body)?;
        debug!("API key derived");
        Ok(raw.into())
    }

    /// Derives the existing key, falling back to minting a fresh one.
    ///
    /// Idempotent from the caller's viewpoint: the same wallet always ends
    /// up with working credentials.
    pub async fn create_or_derive_api_key(&self) -> Result<ApiKeyCreds> {
        match self.derive_api_key(None).await {
            Ok(creds) => Ok(creds),
            Err(_) => self.create_api_key(None).await,
        }
    }

    // =========================================================================
    // Order creation
    // =========================================================================

    /// Signs a limit order locally; nothing is submitted.
    #[instrument(skip(self, params), level = "trace")]
    pub async fn create_order(&self, params: &CreateOrderParams) -> Result<SignedOrder> {
        let neg_risk = match params.neg_risk {
            Some(flag) => flag,
            None => self.inner.get_neg_risk(&params.token_id).await?,
        };

        // BUY: maker pays collateral, receives shares. SELL inverts.
        let (maker_amount, taker_amount) = match params.side {
            Side::Buy => (params.size * params.price, params.size),
            Side::Sell => (params.size, params.size * params.price),
        };

        let args = OrderArgs {
            token_id: parse_token_id(&params.token_id)?,
            maker_amount: parse_base_units(maker_amount)?,
            taker_amount: parse_base_units(taker_amount)?,
            side: params.side,
            taker: Address::ZERO,
            fee_rate_bps: U256::from(params.fee_rate_bps),
            nonce: U256::from(params.nonce),
            expiration: U256::from(params.expiration),
        };

        self.builder.build_signed_order(&args, neg_risk).await
    }

    /// Resolves tick size, price, neg-risk, and fee rate for a market order.
    ///
    /// Caller-provided values short-circuit their probes; otherwise the
    /// probes fire in order: `/tick-size`, `/book`, `/neg-risk`, `/fee-rate`.
    /// `strict_no_fetch` demands all four inputs up front.
    async fn resolve_market_inputs(&self, params: &CreateMarketOrderParams) -> Result<ResolvedInputs> {
        if params.strict_no_fetch {
            let tick_size = params.tick_size.ok_or(ClobError::MissingInput("tick_size"))?;
            let price = match params.price {
                Some(p) if p > 0.0 => p,
                _ => return Err(ClobError::MissingInput("price")),
            };
            let neg_risk = params.neg_risk.ok_or(ClobError::MissingInput("neg_risk"))?;
            let fee_rate_bps = params
                .fee_rate_bps
                .ok_or(ClobError::MissingInput("fee_rate_bps"))?;

            validate_price(price, tick_size)?;
            return Ok(ResolvedInputs {
                tick_size,
                price,
                neg_risk,
                fee_rate_bps,
            });
        }

        let tick_size = match params.tick_size {
            Some(tick) => tick,
            None => self.inner.get_tick_size(&params.token_id).await?,
        };

        let price = match params.price {
            Some(p) if p > 0.0 => p,
            _ => {
                self.inner
                    .calculate_market_price(
                        &params.token_id,
                        params.side,
                        params.amount,
                        params.order_type,
                    )
                    .await?
            }
        };
        validate_price(price, tick_size)?;

        let neg_risk = match params.neg_risk {
            Some(flag) => flag,
            None => self.inner.get_neg_risk(&params.token_id).await?,
        };

        let fee_rate_bps = match params.fee_rate_bps {
            Some(bps) => bps,
            None => self.inner.get_fee_rate_bps(&params.token_id).await?,
        };

        Ok(ResolvedInputs {
            tick_size,
            price,
            neg_risk,
            fee_rate_bps,
        })
    }

    /// Signs a market order, resolving missing inputs from the exchange.
    #[instrument(skip(self, params), level = "trace")]
    pub async fn create_market_order(&self, params: &CreateMarketOrderParams) -> Result<SignedOrder> {
        let resolved = self.resolve_market_inputs(params).await?;

        let config = get_round_config(resolved.tick_size);
        let amounts = derive_market_amounts(params.side, params.amount, resolved.price, &config);

        let args = OrderArgs {
            token_id: parse_token_id(&params.token_id)?,
            maker_amount: parse_base_units(amounts.maker)?,
            taker_amount: parse_base_units(amounts.taker)?,
            side: params.side,
            taker: params.taker.unwrap_or(Address::ZERO),
            fee_rate_bps: U256::from(resolved.fee_rate_bps),
            nonce: U256::from(params.nonce),
            expiration: U256::from(params.expiration),
        };

        trace!(
            price = amounts.price,
            maker = amounts.maker,
            taker = amounts.taker,
            "derived market order amounts"
        );
        self.builder.build_signed_order(&args, resolved.neg_risk).await
    }

    // =========================================================================
    // Order submission
    // =========================================================================

    /// Submits a pre-signed order.
    #[instrument(skip(self, order), level = "trace")]
    pub async fn post_order(
        &self,
        order: &SignedOrder,
        order_type: OrderType,
        post_only: bool,
    ) -> Result<OrderResponse> {
        if post_only && order_type != OrderType::Gtc && order_type != OrderType::Gtd {
            return Err(ClobError::other(
                "post_only is only supported for GTC and GTD orders",
            ));
        }

        let envelope = order_envelope(order, &self.creds()?.api_key, order_type, post_only);
        let body = serde_json::to_string(&envelope)?;
        let headers = self.l2_headers("POST", endpoints::POST_ORDER, Some(&body))?;

        let response = self
            .inner
            .transport()
            .post(endpoints::POST_ORDER, &body, Some(&headers))
            .await;

        let mut result = OrderResponse::from_body(
            response.ok(),
            response.status,
            &response.body,
            response.error.as_deref(),
        );
        result.elapsed_ms = response.elapsed_ms();
        trace!(success = result.success, order_id = %result.order_id, "order posted");
        Ok(result)
    }

    /// Submits a batch of pre-signed orders.
    ///
    /// The response is normally an array of per-order results; a single
    /// error object is promoted to a one-element list.
    #[instrument(skip(self, entries), level = "trace")]
    pub async fn post_orders(
        &self,
        entries: &[BatchOrderEntry],
        post_only: bool,
    ) -> Result<Vec<OrderResponse>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        if post_only {
            for entry in entries {
                if entry.order_type != OrderType::Gtc && entry.order_type != OrderType::Gtd {
                    return Err(ClobError::other(
                        "post_only is only supported for GTC and GTD orders",
                    ));
                }
            }
        }

        let owner = self.creds()?.api_key.clone();
        let payload: Vec<_> = entries
            .iter()
            .map(|entry| order_envelope(&entry.order, &owner, entry.order_type, post_only))
            .collect();
        let body = serde_json::to_string(&payload)?;
        let headers = self.l2_headers("POST", endpoints::POST_ORDERS, Some(&body))?;

        let response = self
            .inner
            .transport()
            .post(endpoints::POST_ORDERS, &body, Some(&headers))
            .await;

        let elapsed_ms = response.elapsed_ms();
        let results = match serde_json::from_str::<Vec<serde_json::Value>>(&response.body) {
            Ok(items) => items
                .iter()
                .map(|item| {
                    let mut parsed = OrderResponse::from_body(
                        response.ok(),
                        response.status,
                        &item.to_string(),
                        response.error.as_deref(),
                    );
                    parsed.elapsed_ms = elapsed_ms;
                    parsed
                })
                .collect(),
            Err(_) => {
                let mut parsed = OrderResponse::from_body(
                    response.ok(),
                    response.status,
                    &response.body,
                    response.error.as_deref(),
                );
                parsed.elapsed_ms = elapsed_ms;
                vec![parsed]
            }
        };
        trace!(count = results.len(), "batch posted");
        Ok(results)
    }

    /// Signs and submits a limit order.
    pub async fn create_and_post_order(
        &self,
        params: &CreateOrderParams,
        order_type: OrderType,
    ) -> Result<OrderResponse> {
        let signed = self.create_order(params).await?;
        self.post_order(&signed, order_type, false).await
    }

    /// Signs and submits a market order.
    pub async fn create_and_post_market_order(
        &self,
        params: &CreateMarketOrderParams,
    ) -> Result<OrderResponse> {
        let order_type = params.order_type;
        let signed = self.create_market_order(params).await?;
        self.post_order(&signed, order_type, false).await
    }

    /// Market-order pipeline with every failure funneled into the response.
    ///
    /// Never errors: resolution, signing, and submission failures all land
    /// in `OrderResponse { success: false, error_msg }`.
    pub async fn submit_market_order(&self, params: CreateMarketOrderParams) -> OrderResponse {
        match self.create_and_post_market_order(&params).await {
            Ok(response) => response,
            Err(e) => OrderResponse::failure(e.to_string()),
        }
    }

    /// Fire-and-forget market order; `callback` is invoked exactly once with
    /// the final outcome.
    pub fn submit_market_order_async<F>(&self, params: CreateMarketOrderParams, callback: F)
    where
        F: FnOnce(OrderResponse) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            callback(client.submit_market_order(params).await);
        });
    }

    // =========================================================================
    // Order cancellation
    // =========================================================================

    async fn cancel(&self, logical_path: &str, body: String) -> Result<bool> {
        let headers = self.l2_headers("DELETE", logical_path, Some(&body))?;
        let response = self
            .inner
            .transport()
            .delete(logical_path, &body, Some(&headers))
            .await;
        if response.status == 0 {
            return Err(ClobError::Transport(
                response.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(response.ok())
    }

    /// Cancels one order by ID.
    #[instrument(skip(self), level = "trace")]
    pub async fn cancel_order(&self, order_id: &str) -> Result<bool> {
        let body = serde_json::to_string(&json!({ "orderID": order_id }))?;
        self.cancel(endpoints::CANCEL_ORDER, body).await
    }

    /// Cancels several orders by ID.
    #[instrument(skip(self, order_ids), level = "trace")]
    pub async fn cancel_orders(&self, order_ids: &[String]) -> Result<bool> {
        let body = serde_json::to_string(order_ids)?;
        self.cancel(endpoints::CANCEL_ORDERS, body).await
    }

    /// Cancels every open order.
    #[instrument(skip(self), level = "trace")]
    pub async fn cancel_all(&self) -> Result<bool> {
        self.cancel(endpoints::CANCEL_ALL, "{}".to_string()).await
    }

    /// Cancels every open order in one market.
    #[instrument(skip(self), level = "trace")]
    pub async fn cancel_market_orders(&self, condition_id: &str) -> Result<bool> {
        let body = serde_json::to_string(&json!({ "market": condition_id }))?;
        self.cancel(endpoints::CANCEL_MARKET_ORDERS, body).await
    }

    // =========================================================================
    // Order queries
    // =========================================================================

    /// A single open order by ID.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_order(&self, order_id: &str) -> Result<OpenOrder> {
        let path = format!("{}{}", endpoints::GET_ORDER, order_id);
        let headers = self.l2_headers("GET", &path, None)?;
        let response = self.inner.transport().get(&path, Some(&headers)).await;
        let body = Client::check(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Open orders, optionally filtered to one market.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_open_orders(&self, market: Option<&str>) -> Result<Vec<OpenOrder>> {
        // Signed over the logical path; the market filter rides the URL only.
        let headers = self.l2_headers("GET", endpoints::GET_OPEN_ORDERS, None)?;
        let path = match market {
            Some(market) => format!("{}?market={}", endpoints::GET_OPEN_ORDERS, market),
            None => endpoints::GET_OPEN_ORDERS.to_string(),
        };
        let response = self.inner.transport().get(&path, Some(&headers)).await;
        let body = Client::check(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Trade history, one cursor page at a time.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_trades(&self, next_cursor: Option<&str>) -> Result<Vec<Trade>> {
        let headers = self.l2_headers("GET", endpoints::GET_TRADES, None)?;
        let path = match next_cursor {
            Some(cursor) => format!("{}?next_cursor={}", endpoints::GET_TRADES, cursor),
            None => endpoints::GET_TRADES.to_string(),
        };
        let response = self.inner.transport().get(&path, Some(&headers)).await;
        let body = Client::check(response)?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Builds the order submission envelope. Field order is part of the wire
/// contract, and `salt` travels as an integer.
pub(crate) fn order_envelope(
    order: &SignedOrder,
    owner: &str,
    order_type: OrderType,
    post_only: bool,
) -> serde_json::Value {
    let mut envelope = json!({
        "order": order.to_json(),
        "owner": owner,
        "orderType": order_type.as_str(),
        "deferExec": false,
    });
    if post_only {
        envelope["postOnly"] = json!(true);
    }
    envelope
}

fn parse_base_units(amount: f64) -> Result<U256> {
    to_base_units(amount, super::order::constants::COLLATERAL_TOKEN_DECIMALS)
        .parse::<U256>()
        .map_err(|e| ClobError::other(format!("amount conversion: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http::{Headers, HttpResponse, Transport};
    use alloy_signer_local::PrivateKeySigner;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Transport that records every request and answers 200 with a canned
    /// body.
    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn get(&self, _path: &str, _headers: Option<&Headers>) -> HttpResponse {
            HttpResponse {
                status: 0,
                error: Some("offline".into()),
                ..Default::default()
            }
        }

        async fn post(&self, _path: &str, _body: &str, _headers: Option<&Headers>) -> HttpResponse {
            HttpResponse {
                status: 0,
                error: Some("offline".into()),
                ..Default::default()
            }
        }

        async fn delete(&self, _path: &str, _body: &str, _headers: Option<&Headers>) -> HttpResponse {
            HttpResponse {
                status: 0,
                error: Some("offline".into()),
                ..Default::default()
            }
        }
    }

    fn offline_client() -> TradingClient {
        let client = Client::with_transport(Arc::new(NullTransport));
        let builder = OrderBuilder::new(PrivateKeySigner::random(), 137, None, None);
        TradingClient::new(client, builder)
    }

    fn sample_signed_order() -> SignedOrder {
        use super::super::order::types::Order;
        let order = Order {
            salt: U256::from(123456789u64),
            maker: Address::ZERO,
            signer: Address::ZERO,
            taker: Address::ZERO,
            tokenId: U256::from(42u64),
            makerAmount: U256::from(1_000_000u64),
            takerAmount: U256::from(2_000_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            feeRateBps: U256::ZERO,
            side: 0,
            signatureType: 0,
        };
        SignedOrder::new(order, vec![0u8; 65])
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = order_envelope(&sample_signed_order(), "api-key-1", OrderType::Fak, false);
        let keys: Vec<&str> = envelope
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["order", "owner", "orderType", "deferExec"]);
        assert_eq!(envelope["owner"], "api-key-1");
        assert_eq!(envelope["orderType"], "FAK");
        assert_eq!(envelope["deferExec"], false);
        assert!(envelope["order"]["salt"].is_u64());
    }

    #[test]
    fn test_envelope_post_only() {
        let envelope = order_envelope(&sample_signed_order(), "k", OrderType::Gtc, true);
        assert_eq!(envelope["postOnly"], true);
    }

    #[tokio::test]
    async fn test_post_order_requires_creds() {
        let client = offline_client();
        let result = client
            .post_order(&sample_signed_order(), OrderType::Gtc, false)
            .await;
        assert!(matches!(result, Err(ClobError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_post_only_rejected_for_fok() {
        let client = offline_client().with_creds(ApiKeyCreds::new("k", "c2VjcmV0", "p"));
        let result = client
            .post_order(&sample_signed_order(), OrderType::Fok, true)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_strict_no_fetch_missing_inputs() {
        let client = offline_client();
        let params = CreateMarketOrderParams {
            token_id: "42".into(),
            amount: 1.0,
            side: Side::Buy,
            strict_no_fetch: true,
            ..Default::default()
        };
        let result = client.create_market_order(&params).await;
        assert!(matches!(result, Err(ClobError::MissingInput("tick_size"))));

        let params = CreateMarketOrderParams {
            token_id: "42".into(),
            amount: 1.0,
            side: Side::Buy,
            strict_no_fetch: true,
            tick_size: Some(TickSize::OneCent),
            ..Default::default()
        };
        let result = client.create_market_order(&params).await;
        assert!(matches!(result, Err(ClobError::MissingInput("price"))));
    }

    #[tokio::test]
    async fn test_strict_no_fetch_signs_without_probes() {
        // The offline transport fails every request, so a successful sign
        // proves no probe was issued.
        let client = offline_client();
        let params = CreateMarketOrderParams {
            token_id: "42".into(),
            amount: 1.0,
            side: Side::Buy,
            strict_no_fetch: true,
            tick_size: Some(TickSize::OneCent),
            price: Some(0.57),
            neg_risk: Some(false),
            fee_rate_bps: Some(0),
            ..Default::default()
        };
        let signed = client.create_market_order(&params).await.unwrap();
        assert_eq!(signed.order.makerAmount, U256::from(1_000_000u64));
        // 1 / 0.57 squeezed to the tick's amount precision.
        assert_eq!(signed.order.takerAmount, U256::from(1_754_300u64));
    }

    #[tokio::test]
    async fn test_strict_no_fetch_invalid_price() {
        let client = offline_client();
        let params = CreateMarketOrderParams {
            token_id: "42".into(),
            amount: 1.0,
            side: Side::Buy,
            strict_no_fetch: true,
            tick_size: Some(TickSize::OneCent),
            price: Some(0.999),
            neg_risk: Some(false),
            fee_rate_bps: Some(0),
            ..Default::default()
        };
        let result = client.create_market_order(&params).await;
        assert!(matches!(result, Err(ClobError::InvalidPrice { .. })));
    }

    #[tokio::test]
    async fn test_submit_market_order_funnels_errors() {
        let client = offline_client();
        let params = CreateMarketOrderParams {
            token_id: "42".into(),
            amount: 1.0,
            side: Side::Buy,
            strict_no_fetch: true,
            ..Default::default()
        };
        let response = client.submit_market_order(params).await;
        assert!(!response.success);
        assert!(response.error_msg.contains("tick_size"));
    }

    #[tokio::test]
    async fn test_cancel_requires_creds() {
        let client = offline_client();
        let result = client.cancel_order("0xdead").await;
        assert!(matches!(result, Err(ClobError::NotAuthenticated)));
    }
}
