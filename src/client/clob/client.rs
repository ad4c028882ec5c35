//! CLOB API client for public (unauthenticated) endpoints.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{instrument, trace};

use crate::client::http::{
    HttpResponse, HttpTransport, Transport, TransportConfig, TransportStats,
};
use crate::error::{ClobError, Result};

/// Default base URL for the CLOB API.
pub const DEFAULT_BASE_URL: &str = "https://clob.polymarket.com";

/// Client for the public CLOB endpoints.
///
/// Holds a shared [`Transport`]; cloning is cheap and clones share the
/// connection pool.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client against the default base URL.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL).expect("default CLOB base URL is valid")
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let transport = TransportConfig::new(base_url).build()?;
        Ok(Self {
            transport: Arc::new(transport),
        })
    }

    /// Creates a client from a transport configuration.
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self {
            transport: Arc::new(transport),
        })
    }

    /// Creates a client over an existing transport (shared pool, or a
    /// scripted transport under test).
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Pre-warms the connection before the first trading request.
    pub async fn warm_connection(&self) -> bool {
        self.transport.warm().await
    }

    /// Starts the keep-alive heartbeat.
    pub fn start_heartbeat(&self, interval: Duration) {
        self.transport.start_heartbeat(interval);
    }

    /// Stops the keep-alive heartbeat.
    pub fn stop_heartbeat(&self) {
        self.transport.stop_heartbeat();
    }

    /// Whether the heartbeat is running.
    pub fn is_heartbeat_running(&self) -> bool {
        self.transport.is_heartbeat_running()
    }

    /// Connection statistics.
    pub fn connection_stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Converts a transport response into a body, surfacing wire and
    /// transport failures as typed errors.
    pub(crate) fn check(response: HttpResponse) -> Result<String> {
        if response.status == 0 {
            return Err(ClobError::Transport(
                response.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        if !response.ok() {
            return Err(ClobError::http(response.status, response.body));
        }
        Ok(response.body)
    }

    /// GET a path and decode its JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.transport.get(path, None).await;
        let body = Self::check(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Server endpoints
    // =========================================================================

    /// Health check; succeeds when the server answers 2xx on the root path.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_ok(&self) -> Result<()> {
        let response = self.transport.get("/", None).await;
        Self::check(response)?;
        trace!("server health check passed");
        Ok(())
    }

    /// Server time in UNIX seconds. The endpoint returns a bare integer.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_server_time(&self) -> Result<u64> {
        let response = self.transport.get("/time", None).await;
        let body = Self::check(response)?;
        body.trim()
            .parse()
            .map_err(|_| ClobError::other(format!("unexpected time response: {}", body)))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
