//! CLOB API: public endpoints, authenticated trading, order construction,
//! and the live order-book feed.

pub mod auth;
pub mod client;
pub mod feed;
pub mod markets;
pub mod order;
pub mod orderbook;
pub mod pricing;
pub mod trading;
pub mod types;
pub mod ws;

pub use client::{Client, DEFAULT_BASE_URL};
pub use feed::{ArbConfig, MarketSnapshot, MarketSpec, OrderBookFeed};
pub use order::{Order, OrderBuilder, Side, SignatureType, SignedOrder, TickSize};
pub use orderbook::{BookLevel, OrderBook};
pub use trading::TradingClient;
pub use types::{
    ApiKeyCreds, BatchOrderEntry, CreateMarketOrderParams, CreateOrderParams, Market, MarketsPage,
    OpenOrder, OrderResponse, OrderType, Token, Trade,
};
