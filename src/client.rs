//! API clients: low-latency HTTP transport, CLOB API, and Data API.

pub mod clob;
pub mod data;
pub mod http;
