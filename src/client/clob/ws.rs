//! Market-channel WebSocket subscriber.

pub mod client;

pub use client::{MarketStream, MessageSink, DEFAULT_WS_URL};
