//! Order construction and signing.
//!
//! EIP-712 typed-data hashing, base-unit conversion, tick-size rounding, and
//! the builder that turns user amounts into exchange-ready signed orders.

pub mod builder;
pub mod constants;
pub mod eip712;
pub mod rounding;
pub mod types;
pub mod units;

pub use builder::{OrderArgs, OrderBuilder};
pub use rounding::{RoundConfig, TickSize};
pub use types::{Order, Side, SignatureType, SignedOrder};
