//! Latency-sensitive Polymarket CLOB trading client.
//!
//! Implements the full order lifecycle against the Polymarket central limit
//! order book: EIP-712 order signing, two-tier (L1 wallet / L2 HMAC)
//! authentication, a keep-alive HTTP transport with connection warming, a
//! reconnecting WebSocket order-book feed, and a YES/NO combined-ask
//! arbitrage detector.
//!
//! # Example
//!
//! ```no_run
//! use polymarket_arb::client::clob::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!
//!     let time = client.get_server_time().await?;
//!     println!("server time: {}", time);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

pub use error::{ClobError, Result};
