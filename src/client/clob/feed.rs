//! Live order-book feed and arbitrage detector.
//!
//! Owns all book and market state: the token -> book map behind a
//! single-writer/many-reader lock, per-market best asks as lock-free
//! atomics, and the token -> condition back-reference that fans socket
//! updates out to the right market record. Each qualifying ingest fires the
//! arbitrage callback at most once; debouncing is the strategy layer's job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::orderbook::{now_ns, OrderBook};
use super::types::Market;
use super::ws::client::{MessageSink, DEFAULT_PING_INTERVAL, DEFAULT_WS_URL};
use super::ws::MarketStream;

/// Default combined-ask trigger: YES + NO below this fires the callback.
pub const DEFAULT_TRIGGER_COMBINED: f64 = 0.98;

/// Feed configuration.
#[derive(Debug, Clone)]
pub struct ArbConfig {
    /// Market-channel WebSocket endpoint.
    pub ws_url: String,
    /// Combined-ask trigger threshold.
    pub trigger_combined: f64,
    /// Keepalive ping interval.
    pub ping_interval: Duration,
}

impl Default for ArbConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            trigger_combined: DEFAULT_TRIGGER_COMBINED,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }
}

/// Identity of a subscribed market.
#[derive(Debug, Clone, Default)]
pub struct MarketSpec {
    pub condition_id: String,
    pub token_yes: String,
    pub token_no: String,
    pub slug: String,
    pub question: String,
    /// Selects the exchange contract when trading this market.
    pub neg_risk: bool,
}

impl MarketSpec {
    /// Builds a spec from a discovery record, when both outcomes resolve.
    pub fn from_market(market: &Market) -> Option<Self> {
        Some(Self {
            condition_id: market.condition_id.clone(),
            token_yes: market.token_yes()?.to_string(),
            token_no: market.token_no()?.to_string(),
            slug: market.market_slug.clone(),
            question: market.question.clone(),
            neg_risk: market.neg_risk,
        })
    }
}

/// Point-in-time copy of a market's tracked state.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub condition_id: String,
    pub token_yes: String,
    pub token_no: String,
    pub slug: String,
    pub neg_risk: bool,
    pub best_ask_yes: f64,
    pub best_ask_no: f64,
    pub best_ask_yes_size: f64,
    pub best_ask_no_size: f64,
    pub update_count: u32,
}

impl MarketSnapshot {
    /// Combined cost of buying both outcomes at their asks.
    pub fn combined(&self) -> f64 {
        self.best_ask_yes + self.best_ask_no
    }

    /// Whether buying both sides at the asks locks in a profit at the given
    /// threshold.
    pub fn is_arb_opportunity(&self, threshold: f64) -> bool {
        self.combined() < threshold
    }
}

/// Market record written by the socket task and read lock-free.
///
/// Best-ask fields are f64 bit patterns in atomics so readers never see a
/// partial write.
struct LiveMarket {
    spec: MarketSpec,
    best_ask_yes: AtomicU64,
    best_ask_no: AtomicU64,
    best_ask_yes_size: AtomicU64,
    best_ask_no_size: AtomicU64,
    last_update_ns: AtomicU64,
    update_count: AtomicU32,
}

impl LiveMarket {
    fn new(spec: MarketSpec) -> Self {
        Self {
            spec,
            best_ask_yes: AtomicU64::new(0),
            best_ask_no: AtomicU64::new(0),
            best_ask_yes_size: AtomicU64::new(0),
            best_ask_no_size: AtomicU64::new(0),
            last_update_ns: AtomicU64::new(0),
            update_count: AtomicU32::new(0),
        }
    }

    fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            condition_id: self.spec.condition_id.clone(),
            token_yes: self.spec.token_yes.clone(),
            token_no: self.spec.token_no.clone(),
            slug: self.spec.slug.clone(),
            neg_risk: self.spec.neg_risk,
            best_ask_yes: load_f64(&self.best_ask_yes),
            best_ask_no: load_f64(&self.best_ask_no),
            best_ask_yes_size: load_f64(&self.best_ask_yes_size),
            best_ask_no_size: load_f64(&self.best_ask_no_size),
            update_count: self.update_count.load(Ordering::Relaxed),
        }
    }
}

fn load_f64(atomic: &AtomicU64) -> f64 {
    f64::from_bits(atomic.load(Ordering::Relaxed))
}

fn store_f64(atomic: &AtomicU64, value: f64) {
    atomic.store(value.to_bits(), Ordering::Relaxed);
}

type UpdateCallback = Box<dyn Fn(&str, &OrderBook) + Send + Sync>;
type ArbCallback = Box<dyn Fn(&MarketSnapshot, f64) + Send + Sync>;

struct FeedShared {
    config: ArbConfig,
    books: RwLock<HashMap<String, OrderBook>>,
    markets: RwLock<HashMap<String, Arc<LiveMarket>>>,
    token_to_condition: RwLock<HashMap<String, String>>,
    subscribed_tokens: RwLock<Vec<String>>,
    total_updates: AtomicU64,
    on_update: RwLock<Option<UpdateCallback>>,
    on_arb: RwLock<Option<ArbCallback>>,
}

/// Subscription manager over the market channel.
#[derive(Clone)]
pub struct OrderBookFeed {
    shared: Arc<FeedShared>,
}

impl OrderBookFeed {
    /// Creates a feed with the given configuration.
    pub fn new(config: ArbConfig) -> Self {
        Self {
            shared: Arc::new(FeedShared {
                config,
                books: RwLock::new(HashMap::new()),
                markets: RwLock::new(HashMap::new()),
                token_to_condition: RwLock::new(HashMap::new()),
                subscribed_tokens: RwLock::new(Vec::new()),
                total_updates: AtomicU64::new(0),
                on_update: RwLock::new(None),
                on_arb: RwLock::new(None),
            }),
        }
    }

    /// The feed configuration.
    pub fn config(&self) -> &ArbConfig {
        &self.shared.config
    }

    // =========================================================================
    // Subscription set
    // =========================================================================

    /// Tracks a market: both outcome tokens join the subscription set and a
    /// zeroed market record is created.
    pub fn subscribe(&self, spec: &MarketSpec) {
        self.shared
            .markets
            .write()
            .insert(spec.condition_id.clone(), Arc::new(LiveMarket::new(spec.clone())));

        {
            let mut map = self.shared.token_to_condition.write();
            map.insert(spec.token_yes.clone(), spec.condition_id.clone());
            map.insert(spec.token_no.clone(), spec.condition_id.clone());
        }

        {
            let mut tokens = self.shared.subscribed_tokens.write();
            tokens.push(spec.token_yes.clone());
            tokens.push(spec.token_no.clone());
        }

        debug!(slug = %spec.slug, condition_id = %spec.condition_id, "subscribed to market");
    }

    /// Tracks several markets.
    pub fn subscribe_all(&self, specs: &[MarketSpec]) {
        for spec in specs {
            self.subscribe(spec);
        }
    }

    /// Drops one token from the subscription set and its stored book.
    pub fn unsubscribe(&self, token_id: &str) {
        self.shared
            .subscribed_tokens
            .write()
            .retain(|t| t != token_id);
        self.shared.books.write().remove(token_id);
    }

    /// Clears every subscription, book, and market record.
    pub fn unsubscribe_all(&self) {
        self.shared.subscribed_tokens.write().clear();
        self.shared.books.write().clear();
        self.shared.markets.write().clear();
        self.shared.token_to_condition.write().clear();
    }

    /// The current join set.
    pub fn subscribed_tokens(&self) -> Vec<String> {
        self.shared.subscribed_tokens.read().clone()
    }

    /// The join message for the current subscription set.
    pub fn join_message_json(&self) -> String {
        serde_json::json!({
            "type": "market",
            "assets_ids": self.subscribed_tokens(),
        })
        .to_string()
    }

    // =========================================================================
    // Lookups (snapshots, not live references)
    // =========================================================================

    /// Copy of the stored book for a token.
    pub fn get_orderbook(&self, token_id: &str) -> Option<OrderBook> {
        self.shared.books.read().get(token_id).cloned()
    }

    /// Snapshot of a market's tracked state.
    pub fn get_market(&self, condition_id: &str) -> Option<MarketSnapshot> {
        self.shared
            .markets
            .read()
            .get(condition_id)
            .map(|m| m.snapshot())
    }

    /// Snapshots of every tracked market.
    pub fn markets(&self) -> Vec<MarketSnapshot> {
        self.shared
            .markets
            .read()
            .values()
            .map(|m| m.snapshot())
            .collect()
    }

    /// Total book updates ingested.
    pub fn total_updates(&self) -> u64 {
        self.shared.total_updates.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Invoked after each book update is stored.
    pub fn on_book_update<F>(&self, callback: F)
    where
        F: Fn(&str, &OrderBook) + Send + Sync + 'static,
    {
        *self.shared.on_update.write() = Some(Box::new(callback));
    }

    /// Invoked when a market's combined ask crosses the trigger.
    pub fn on_arb_opportunity<F>(&self, callback: F)
    where
        F: Fn(&MarketSnapshot, f64) + Send + Sync + 'static,
    {
        *self.shared.on_arb.write() = Some(Box::new(callback));
    }

    // =========================================================================
    // Socket plumbing
    // =========================================================================

    /// Spawns the reconnecting socket task feeding this feed.
    pub fn start(&self) -> MarketStream {
        MarketStream::spawn(
            self.shared.config.ws_url.clone(),
            self.shared.config.ping_interval,
            Arc::new(self.clone()),
        )
    }

    /// Ingests one raw frame from the market channel.
    ///
    /// Two envelope shapes are tolerated: the legacy
    /// `{event_type, asset_id, bids, asks}` events and the aggregated
    /// `{topic: "clob_market", type: "agg_orderbook", payload: {...}}`
    /// stream. Anything else is dropped silently.
    pub fn handle_message(&self, text: &str) {
        if text.is_empty() || text == "{}" {
            return;
        }

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparsable market message");
                return;
            }
        };

        // Messages may arrive singly or batched in an array.
        match value {
            Value::Array(items) => {
                for item in items {
                    self.handle_envelope(&item);
                }
            }
            other => self.handle_envelope(&other),
        }
    }

    fn handle_envelope(&self, value: &Value) {
        // Aggregated real-time stream format.
        if value.get("topic").and_then(Value::as_str) == Some("clob_market")
            && value.get("type").and_then(Value::as_str) == Some("agg_orderbook")
        {
            if let Some(payload) = value.get("payload") {
                if let Some(mut book) = OrderBook::from_json(payload) {
                    if book.server_timestamp == 0 {
                        if let Some(ts) = value.get("timestamp").and_then(Value::as_u64) {
                            book.server_timestamp = ts;
                        }
                    }
                    self.apply_book(book);
                }
            }
            return;
        }

        // Legacy event format.
        match value.get("event_type").and_then(Value::as_str) {
            Some("book") | Some("price_change") => {
                if let Some(book) = OrderBook::from_json(value) {
                    self.apply_book(book);
                }
            }
            other => {
                trace!(event_type = ?other, "ignoring market message");
            }
        }
    }

    /// Stores a parsed book, refreshes the owning market's best asks, and
    /// runs the callbacks.
    pub fn apply_book(&self, book: OrderBook) {
        let asset_id = book.asset_id.clone();

        {
            let mut books = self.shared.books.write();
            books.insert(asset_id.clone(), book.clone());
        }
        self.shared.total_updates.fetch_add(1, Ordering::Relaxed);

        let condition_id = match self.shared.token_to_condition.read().get(&asset_id) {
            Some(condition_id) => condition_id.clone(),
            None => return,
        };

        let market = match self.shared.markets.read().get(&condition_id) {
            Some(market) => Arc::clone(market),
            None => return,
        };

        if asset_id == market.spec.token_yes {
            store_f64(&market.best_ask_yes, book.best_ask());
            store_f64(&market.best_ask_yes_size, book.best_ask_size());
        } else if asset_id == market.spec.token_no {
            store_f64(&market.best_ask_no, book.best_ask());
            store_f64(&market.best_ask_no_size, book.best_ask_size());
        }
        market
            .last_update_ns
            .store(book.received_at_ns.max(now_ns()), Ordering::Relaxed);
        market.update_count.fetch_add(1, Ordering::Relaxed);

        if let Some(callback) = self.shared.on_update.read().as_ref() {
            callback(&asset_id, &book);
        }

        self.check_arb_opportunity(&market);
    }

    /// Fires the arbitrage callback when both asks are live and their sum is
    /// under the trigger. Called once per ingested update.
    fn check_arb_opportunity(&self, market: &LiveMarket) {
        let ask_yes = load_f64(&market.best_ask_yes);
        let ask_no = load_f64(&market.best_ask_no);
        if ask_yes <= 0.0 || ask_no <= 0.0 {
            return;
        }

        let combined = ask_yes + ask_no;
        if combined < self.shared.config.trigger_combined {
            if let Some(callback) = self.shared.on_arb.read().as_ref() {
                callback(&market.snapshot(), combined);
            }
        }
    }
}

impl MessageSink for OrderBookFeed {
    fn join_message(&self) -> Option<String> {
        let tokens = self.subscribed_tokens();
        if tokens.is_empty() {
            return None;
        }
        Some(self.join_message_json())
    }

    fn on_message(&self, text: &str) {
        self.handle_message(text);
    }
}
