//! Market-order pipeline against a scripted transport: probe ordering,
//! strict-no-fetch, wire payloads, and L2 signing over logical paths.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use polymarket_arb::client::clob::auth::sign_l2_request;
use polymarket_arb::client::clob::{
    ApiKeyCreds, Client, CreateMarketOrderParams, OrderBuilder, OrderType, Side, TickSize,
    TradingClient,
};
use polymarket_arb::client::http::{Headers, HttpResponse, Transport};

const SECRET: &str = "dGVzdHNlY3JldA==";

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    body: String,
    headers: Headers,
}

/// Transport that logs every request and answers from a fixed script.
struct RecorderTransport {
    log: Mutex<Vec<RecordedRequest>>,
}

impl RecorderTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, method: &str, path: &str, body: &str, headers: Option<&Headers>) {
        self.log.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            body: body.to_string(),
            headers: headers.cloned().unwrap_or_default(),
        });
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    fn respond(path: &str) -> String {
        if path.starts_with("/tick-size") {
            r#"{"minimum_tick_size":"0.01"}"#.to_string()
        } else if path.starts_with("/book") {
            serde_json::json!({
                "asset_id": "42",
                "bids": [{"price": "0.40", "size": "100"}],
                "asks": [{"price": "0.57", "size": "100"}],
                "timestamp": "1700000000000"
            })
            .to_string()
        } else if path.starts_with("/neg-risk") {
            r#"{"neg_risk":false}"#.to_string()
        } else if path.starts_with("/fee-rate") {
            r#"{"base_fee":0}"#.to_string()
        } else if path.starts_with("/orders") {
            "[]".to_string()
        } else {
            "{}".to_string()
        }
    }
}

#[async_trait]
impl Transport for RecorderTransport {
    async fn get(&self, path: &str, headers: Option<&Headers>) -> HttpResponse {
        self.record("GET", path, "", headers);
        HttpResponse {
            status: 200,
            body: Self::respond(path),
            error: None,
            elapsed: Duration::from_millis(1),
        }
    }

    async fn post(&self, path: &str, body: &str, headers: Option<&Headers>) -> HttpResponse {
        self.record("POST", path, body, headers);
        let body = if path == "/order" {
            r#"{"success":true,"orderID":"0xabc","status":"matched"}"#.to_string()
        } else {
            Self::respond(path)
        };
        HttpResponse {
            status: 200,
            body,
            error: None,
            elapsed: Duration::from_millis(1),
        }
    }

    async fn delete(&self, path: &str, body: &str, headers: Option<&Headers>) -> HttpResponse {
        self.record("DELETE", path, body, headers);
        HttpResponse {
            status: 200,
            body: "{}".to_string(),
            error: None,
            elapsed: Duration::from_millis(1),
        }
    }
}

fn trading_client(recorder: &Arc<RecorderTransport>) -> TradingClient {
    let client = Client::with_transport(Arc::clone(recorder) as Arc<dyn Transport>);
    let builder = OrderBuilder::from_private_key(
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        137,
        None,
        None,
    )
    .unwrap();
    TradingClient::new(client, builder).with_creds(ApiKeyCreds::new("api-key-1", SECRET, "pass"))
}

fn market_params() -> CreateMarketOrderParams {
    CreateMarketOrderParams {
        token_id: "42".to_string(),
        amount: 1.0,
        side: Side::Buy,
        order_type: OrderType::Fok,
        ..Default::default()
    }
}

#[tokio::test]
async fn pipeline_probes_fire_in_order() {
    let recorder = RecorderTransport::new();
    let client = trading_client(&recorder);

    let response = client.submit_market_order(market_params()).await;
    assert!(response.success, "error: {}", response.error_msg);
    assert_eq!(response.order_id, "0xabc");

    let requests = recorder.requests();
    let sequence: Vec<(String, String)> = requests
        .iter()
        .map(|r| (r.method.clone(), r.path.clone()))
        .collect();
    assert_eq!(
        sequence,
        vec![
            ("GET".to_string(), "/tick-size?token_id=42".to_string()),
            ("GET".to_string(), "/book?token_id=42".to_string()),
            ("GET".to_string(), "/neg-risk?token_id=42".to_string()),
            ("GET".to_string(), "/fee-rate?token_id=42".to_string()),
            ("POST".to_string(), "/order".to_string()),
        ]
    );
}

#[tokio::test]
async fn pipeline_skips_probes_for_supplied_inputs() {
    let recorder = RecorderTransport::new();
    let client = trading_client(&recorder);

    let params = CreateMarketOrderParams {
        price: Some(0.57),
        neg_risk: Some(false),
        ..market_params()
    };
    let response = client.submit_market_order(params).await;
    assert!(response.success);

    let paths: Vec<String> = recorder.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec!["/tick-size?token_id=42", "/fee-rate?token_id=42", "/order"]
    );
}

#[tokio::test]
async fn strict_no_fetch_issues_only_the_post() {
    let recorder = RecorderTransport::new();
    let client = trading_client(&recorder);

    let params = CreateMarketOrderParams {
        strict_no_fetch: true,
        tick_size: Some(TickSize::OneCent),
        price: Some(0.57),
        neg_risk: Some(false),
        fee_rate_bps: Some(0),
        ..market_params()
    };
    let response = client.submit_market_order(params).await;
    assert!(response.success);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/order");
}

#[tokio::test]
async fn posted_payload_carries_derived_amounts() {
    let recorder = RecorderTransport::new();
    let client = trading_client(&recorder);

    let response = client.submit_market_order(market_params()).await;
    assert!(response.success);

    let requests = recorder.requests();
    let post = requests.last().unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&post.body).unwrap();

    assert_eq!(envelope["owner"], "api-key-1");
    assert_eq!(envelope["orderType"], "FOK");
    assert_eq!(envelope["deferExec"], false);

    let order = &envelope["order"];
    assert!(order["salt"].is_u64());
    assert_eq!(order["side"], "BUY");
    assert_eq!(order["makerAmount"], "1000000");
    // $1.00 at 0.57: 1 / 0.57 squeezed into four amount decimals.
    assert_eq!(order["takerAmount"], "1754300");
    assert_eq!(order["feeRateBps"], "0");
}

#[tokio::test]
async fn l2_signature_covers_logical_path_without_query() {
    let recorder = RecorderTransport::new();
    let client = trading_client(&recorder);

    client.get_open_orders(Some("0xcond")).await.unwrap();

    let requests = recorder.requests();
    let request = &requests[0];
    // The outbound URL carries the filter...
    assert_eq!(request.path, "/orders?market=0xcond");

    // ...while the HMAC covers the logical path only.
    let timestamp = &request.headers["POLY_TIMESTAMP"];
    let expected = sign_l2_request(SECRET, timestamp, "GET", "/orders", "").unwrap();
    assert_eq!(request.headers["POLY_SIGNATURE"], expected);

    for key in [
        "POLY_ADDRESS",
        "POLY_SIGNATURE",
        "POLY_TIMESTAMP",
        "POLY_API_KEY",
        "POLY_PASSPHRASE",
    ] {
        assert!(request.headers.contains_key(key), "missing {key}");
    }
}

#[tokio::test]
async fn cancel_issues_genuine_delete_with_body() {
    let recorder = RecorderTransport::new();
    let client = trading_client(&recorder);

    assert!(client.cancel_order("0xdead").await.unwrap());

    let requests = recorder.requests();
    let request = &requests[0];
    assert_eq!(request.method, "DELETE");
    assert_eq!(request.path, "/order");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["orderID"], "0xdead");
}

#[tokio::test]
async fn fok_without_liquidity_reports_no_match() {
    struct EmptyBookTransport;

    #[async_trait]
    impl Transport for EmptyBookTransport {
        async fn get(&self, path: &str, _headers: Option<&Headers>) -> HttpResponse {
            let body = if path.starts_with("/book") {
                r#"{"asset_id":"42","bids":[],"asks":[]}"#.to_string()
            } else {
                RecorderTransport::respond(path)
            };
            HttpResponse {
                status: 200,
                body,
                error: None,
                elapsed: Duration::ZERO,
            }
        }

        async fn post(&self, _path: &str, _body: &str, _headers: Option<&Headers>) -> HttpResponse {
            unreachable!("no order should be posted without a price")
        }

        async fn delete(&self, _path: &str, _body: &str, _headers: Option<&Headers>) -> HttpResponse {
            unreachable!()
        }
    }

    let client = Client::with_transport(Arc::new(EmptyBookTransport));
    let builder = OrderBuilder::from_private_key(
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        137,
        None,
        None,
    )
    .unwrap();
    let trading =
        TradingClient::new(client, builder).with_creds(ApiKeyCreds::new("k", SECRET, "p"));

    let response = trading.submit_market_order(market_params()).await;
    assert!(!response.success);
    assert!(response.error_msg.contains("no match"));
}
