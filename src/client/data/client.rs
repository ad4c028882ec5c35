//! Data API client.
//!
//! The Data API lives on its own host, so this client owns an independent
//! transport rather than sharing the CLOB connection (proxy settings on the
//! trading transport intentionally do not apply here).

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::clob::Client as ClobClient;
use crate::client::http::{Transport, TransportConfig};
use crate::error::Result;

/// Default base URL for the Data API.
pub const DEFAULT_BASE_URL: &str = "https://data-api.polymarket.com";

/// Client for the Data API.
#[derive(Clone)]
pub struct DataClient {
    transport: Arc<dyn Transport>,
}

impl DataClient {
    /// Creates a client against the default base URL.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL).expect("default data base URL is valid")
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let transport = TransportConfig::new(base_url).build()?;
        Ok(Self {
            transport: Arc::new(transport),
        })
    }

    /// Creates a client over an existing transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// GET a path and decode its JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.transport.get(path, None).await;
        let body = ClobClient::check(response)?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for DataClient {
    fn default() -> Self {
        Self::new()
    }
}
