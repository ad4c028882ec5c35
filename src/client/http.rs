//! Low-latency HTTP transport with retry middleware.
//!
//! Wraps a keep-alive `reqwest` client with the knobs the trading path needs:
//! connection warming, an idle heartbeat, request statistics, a caching DNS
//! resolver, and a completion-queue async engine for fire-and-forget
//! requests. Endpoint clients talk to the [`Transport`] trait so tests can
//! substitute a scripted transport.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::error::Result;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default DNS cache entry lifetime.
pub const DEFAULT_DNS_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default TCP keepalive probe interval.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Default idle connection timeout.
pub const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Default maximum retry attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Extra request headers, keyed by header name. Entries shadow the
/// transport's default headers.
pub type Headers = HashMap<String, String>;

/// Completed-request callback for the async engine.
pub type AsyncCallback = Box<dyn FnOnce(HttpResponse) + Send + 'static>;

// =============================================================================
// Response
// =============================================================================

/// Outcome of a single HTTP request.
///
/// Transport methods never fail at the type level: network and timeout
/// failures surface as `status == 0` with `error` populated, while wire
/// statuses are reported verbatim together with the raw body.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code, or 0 when the request never reached the wire.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Transport-level error description, if any.
    pub error: Option<String>,
    /// Wall-clock time spent on the request.
    pub elapsed: Duration,
}

impl HttpResponse {
    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Cumulative connection statistics.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    /// Total requests issued.
    pub total_requests: u64,
    /// Requests that rode an already-warm connection.
    pub reused_connections: u64,
    /// Mean request latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Latency of the most recent request in milliseconds.
    pub last_latency_ms: f64,
    /// Whether the connection has been warmed.
    pub connection_warm: bool,
}

#[derive(Debug, Default)]
struct StatsInner {
    total_requests: u64,
    reused_connections: u64,
    total_latency_ms: f64,
    last_latency_ms: f64,
}

// =============================================================================
// Transport trait
// =============================================================================

/// Request surface shared by the real transport and test doubles.
///
/// Mirrors the synchronous client contract: GET/POST/DELETE against a path
/// (query string included), optional extra headers, plus warming, heartbeat
/// control, and statistics. Defaults are no-ops so scripted transports only
/// implement the request methods.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET request.
    async fn get(&self, path: &str, headers: Option<&Headers>) -> HttpResponse;

    /// Performs a POST request with a JSON body.
    async fn post(&self, path: &str, body: &str, headers: Option<&Headers>) -> HttpResponse;

    /// Performs a DELETE request with a JSON body.
    async fn delete(&self, path: &str, body: &str, headers: Option<&Headers>) -> HttpResponse;

    /// Pre-warms the connection; returns true when the transport is hot.
    async fn warm(&self) -> bool {
        false
    }

    /// Starts the background heartbeat.
    fn start_heartbeat(&self, _interval: Duration) {}

    /// Stops the background heartbeat.
    fn stop_heartbeat(&self) {}

    /// Whether the heartbeat task is running.
    fn is_heartbeat_running(&self) -> bool {
        false
    }

    /// Cumulative request statistics.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for building an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL prepended to every request path.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// DNS cache entry lifetime.
    pub dns_cache_ttl: Duration,
    /// TCP keepalive probe interval.
    pub keepalive_interval: Duration,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Maximum retry attempts for transient failures.
    pub max_retries: u32,
    /// Proxy URL; the scheme selects HTTP, SOCKS4, or SOCKS5h.
    pub proxy: Option<String>,
    /// Custom user agent.
    pub user_agent: Option<String>,
    /// Send DELETEs as POST with an `X-HTTP-Method-Override` header, for
    /// servers that reject DELETE bodies.
    pub post_override_delete: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            dns_cache_ttl: DEFAULT_DNS_CACHE_TTL,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            proxy: None,
            user_agent: None,
            post_override_delete: false,
        }
    }
}

impl TransportConfig {
    /// Creates a configuration pointed at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the DNS cache entry lifetime.
    pub fn with_dns_cache_ttl(mut self, ttl: Duration) -> Self {
        self.dns_cache_ttl = ttl;
        self
    }

    /// Sets the TCP keepalive probe interval.
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Sets the maximum retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sends DELETEs as POST with a method-override header.
    pub fn with_post_override_delete(mut self, enabled: bool) -> Self {
        self.post_override_delete = enabled;
        self
    }

    /// Builds the transport from this configuration.
    pub fn build(self) -> Result<HttpTransport> {
        HttpTransport::new(self)
    }
}

// =============================================================================
// Caching DNS resolver
// =============================================================================

/// Blocking-getaddrinfo resolver with a TTL cache, so repeated requests to
/// the exchange host skip the system resolver entirely.
#[derive(Debug)]
struct CachingResolver {
    ttl: Duration,
    cache: Arc<Mutex<HashMap<String, (Vec<SocketAddr>, Instant)>>>,
}

impl CachingResolver {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Resolve for CachingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();

        {
            let cache = self.cache.lock().expect("dns cache poisoned");
            if let Some((addrs, inserted)) = cache.get(&host) {
                if inserted.elapsed() < self.ttl {
                    trace!(host = %host, "dns cache hit");
                    let addrs = addrs.clone();
                    return Box::pin(async move { Ok(Box::new(addrs.into_iter()) as Addrs) });
                }
            }
        }

        let ttl = self.ttl;
        let cache = Arc::clone(&self.cache);
        Box::pin(async move {
            let lookup_host = host.clone();
            let addrs = tokio::task::spawn_blocking(move || {
                (lookup_host.as_str(), 0u16)
                    .to_socket_addrs()
                    .map(|iter| iter.collect::<Vec<_>>())
            })
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

            debug!(host = %host, count = addrs.len(), ttl_secs = ttl.as_secs(), "dns resolved");
            cache
                .lock()
                .expect("dns cache poisoned")
                .insert(host, (addrs.clone(), Instant::now()));

            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

// =============================================================================
// HttpTransport
// =============================================================================

struct TransportInner {
    client: ClientWithMiddleware,
    base_url: String,
    post_override_delete: bool,
    stats: Mutex<StatsInner>,
    warm: AtomicBool,
    heartbeat_running: AtomicBool,
}

/// Keep-alive HTTP transport. Cheap to clone; clones share the connection
/// pool, statistics, and heartbeat state.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<TransportInner>,
}

impl HttpTransport {
    /// Builds a transport from the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self> {
        if !config.base_url.is_empty() {
            url::Url::parse(&config.base_url)?;
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .tcp_keepalive(Some(config.keepalive_interval))
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .default_headers(default_headers)
            .dns_resolver(Arc::new(CachingResolver::new(config.dns_cache_ttl)));

        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        if let Some(proxy_url) = &config.proxy {
            // Residential proxies commonly intercept TLS; mirror the relaxed
            // verification the direct path does not need.
            builder = builder
                .proxy(reqwest::Proxy::all(proxy_url.as_str())?)
                .danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            inner: Arc::new(TransportInner {
                client,
                base_url,
                post_override_delete: config.post_override_delete,
                stats: Mutex::new(StatsInner::default()),
                warm: AtomicBool::new(false),
                heartbeat_running: AtomicBool::new(false),
            }),
        })
    }

    /// The configured base URL (trailing slash trimmed).
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn record(&self, success: bool, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        let was_warm = self.inner.warm.load(Ordering::Relaxed);
        {
            let mut stats = self.inner.stats.lock().expect("stats poisoned");
            stats.total_requests += 1;
            stats.total_latency_ms += ms;
            stats.last_latency_ms = ms;
            if was_warm {
                stats.reused_connections += 1;
            }
        }
        if success && !was_warm {
            self.inner.warm.store(true, Ordering::Relaxed);
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
        headers: Option<&Headers>,
    ) -> HttpResponse {
        let url = format!("{}{}", self.inner.base_url, path);
        trace!(method = method, url = %url, "sending HTTP request");

        let mut request = match method {
            "GET" => self.inner.client.get(url.as_str()),
            "POST" => self.inner.client.post(url.as_str()),
            "DELETE" => {
                if self.inner.post_override_delete {
                    self.inner
                        .client
                        .post(url.as_str())
                        .header("X-HTTP-Method-Override", "DELETE")
                } else {
                    self.inner.client.delete(url.as_str())
                }
            }
            other => {
                return HttpResponse {
                    status: 0,
                    body: String::new(),
                    error: Some(format!("unsupported method: {}", other)),
                    elapsed: Duration::ZERO,
                }
            }
        };

        if let Some(body) = body {
            request = request.body(body.to_string());
        }
        if let Some(extra) = headers {
            for (key, value) in extra {
                request = request.header(key, value);
            }
        }

        let start = Instant::now();
        let result = request.send().await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                self.record(true, elapsed);
                trace!(status = status, elapsed_ms = elapsed.as_millis() as u64, "received HTTP response");
                HttpResponse {
                    status,
                    body,
                    error: None,
                    elapsed,
                }
            }
            Err(e) => {
                self.record(false, elapsed);
                debug!(error = %e, url = %url, "HTTP request failed");
                HttpResponse {
                    status: 0,
                    body: String::new(),
                    error: Some(e.to_string()),
                    elapsed,
                }
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, headers: Option<&Headers>) -> HttpResponse {
        self.request("GET", path, None, headers).await
    }

    async fn post(&self, path: &str, body: &str, headers: Option<&Headers>) -> HttpResponse {
        self.request("POST", path, Some(body), headers).await
    }

    async fn delete(&self, path: &str, body: &str, headers: Option<&Headers>) -> HttpResponse {
        self.request("DELETE", path, Some(body), headers).await
    }

    /// Establishes TCP/TLS before the first trading request. Hits `/time`,
    /// and on any 2xx or 404 marks the connection hot and primes the edge
    /// cache with a `/markets` fetch.
    async fn warm(&self) -> bool {
        let response = self.get("/time", None).await;
        if response.ok() || response.status == 404 {
            self.inner.warm.store(true, Ordering::Relaxed);
            let _ = self.get("/markets", None).await;
            debug!("connection warmed");
            return true;
        }
        warn!(status = response.status, "connection warm-up failed");
        false
    }

    fn start_heartbeat(&self, interval: Duration) {
        if self
            .inner
            .heartbeat_running
            .swap(true, Ordering::SeqCst)
        {
            return;
        }

        let transport = self.clone();
        tokio::spawn(async move {
            debug!(interval_secs = interval.as_secs(), "heartbeat started");
            let running = || transport.inner.heartbeat_running.load(Ordering::Relaxed);
            'outer: while running() {
                // Sleep in 100 ms increments so stop_heartbeat takes effect
                // within one tick.
                let ticks = (interval.as_millis() / 100).max(1);
                for _ in 0..ticks {
                    if !running() {
                        break 'outer;
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                if !running() {
                    break;
                }
                let response = transport.get("/time", None).await;
                trace!(status = response.status, "heartbeat fired");
            }
            debug!("heartbeat stopped");
        });
    }

    fn stop_heartbeat(&self) {
        self.inner.heartbeat_running.store(false, Ordering::SeqCst);
    }

    fn is_heartbeat_running(&self) -> bool {
        self.inner.heartbeat_running.load(Ordering::Relaxed)
    }

    fn stats(&self) -> TransportStats {
        let stats = self.inner.stats.lock().expect("stats poisoned");
        TransportStats {
            total_requests: stats.total_requests,
            reused_connections: stats.reused_connections,
            avg_latency_ms: if stats.total_requests > 0 {
                stats.total_latency_ms / stats.total_requests as f64
            } else {
                0.0
            },
            last_latency_ms: stats.last_latency_ms,
            connection_warm: self.inner.warm.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Async engine
// =============================================================================

/// Fire-and-forget request engine over any [`Transport`].
///
/// Each enqueued request completes exactly once into its callback; the
/// runtime drains completions as long as work is pending, and callers can
/// block on [`AsyncEngine::poll_async`] to synchronize with the queue.
#[derive(Clone)]
pub struct AsyncEngine {
    transport: Arc<dyn Transport>,
    pending: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl AsyncEngine {
    /// Creates an engine bound to the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    fn spawn<F>(&self, fut: F, callback: AsyncCallback)
    where
        F: std::future::Future<Output = HttpResponse> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let pending = Arc::clone(&self.pending);
        let notify = Arc::clone(&self.notify);
        tokio::spawn(async move {
            let response = fut.await;
            callback(response);
            pending.fetch_sub(1, Ordering::SeqCst);
            notify.notify_waiters();
        });
    }

    /// Enqueues a GET whose completion is delivered once to `callback`.
    pub fn get_async(&self, path: &str, headers: Option<Headers>, callback: AsyncCallback) {
        let transport = Arc::clone(&self.transport);
        let path = path.to_string();
        self.spawn(
            async move { transport.get(&path, headers.as_ref()).await },
            callback,
        );
    }

    /// Enqueues a POST whose completion is delivered once to `callback`.
    pub fn post_async(
        &self,
        path: &str,
        body: String,
        headers: Option<Headers>,
        callback: AsyncCallback,
    ) {
        let transport = Arc::clone(&self.transport);
        let path = path.to_string();
        self.spawn(
            async move { transport.post(&path, &body, headers.as_ref()).await },
            callback,
        );
    }

    /// Waits up to `timeout` for completions; returns how many requests
    /// finished during the wait.
    pub async fn poll_async(&self, timeout: Duration) -> usize {
        let before = self.pending.load(Ordering::SeqCst);
        if before == 0 {
            return 0;
        }
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
        before.saturating_sub(self.pending.load(Ordering::SeqCst))
    }

    /// Number of requests still in flight.
    pub fn pending_async(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.dns_cache_ttl, DEFAULT_DNS_CACHE_TTL);
        assert_eq!(config.keepalive_interval, DEFAULT_KEEPALIVE_INTERVAL);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.proxy.is_none());
        assert!(!config.post_override_delete);
    }

    #[test]
    fn test_config_builder() {
        let config = TransportConfig::new("https://example.com/")
            .with_timeout(Duration::from_secs(1))
            .with_dns_cache_ttl(Duration::from_secs(30))
            .with_user_agent("arb/1.0")
            .with_post_override_delete(true);
        assert_eq!(config.base_url, "https://example.com/");
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.dns_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.user_agent.as_deref(), Some("arb/1.0"));
        assert!(config.post_override_delete);
    }

    #[test]
    fn test_response_ok_ranges() {
        let mut response = HttpResponse::default();
        assert!(!response.ok());
        response.status = 200;
        assert!(response.ok());
        response.status = 299;
        assert!(response.ok());
        response.status = 404;
        assert!(!response.ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = TransportConfig::new("https://example.com/").build().unwrap();
        assert_eq!(transport.base_url(), "https://example.com");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(TransportConfig::new("not-a-valid-url").build().is_err());
    }

    #[tokio::test]
    async fn test_heartbeat_flag_lifecycle() {
        let transport = TransportConfig::new("https://example.com").build().unwrap();
        assert!(!transport.is_heartbeat_running());
        transport.start_heartbeat(Duration::from_secs(60));
        assert!(transport.is_heartbeat_running());
        transport.stop_heartbeat();
        assert!(!transport.is_heartbeat_running());
    }

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn get(&self, path: &str, _headers: Option<&Headers>) -> HttpResponse {
            HttpResponse {
                status: 200,
                body: path.to_string(),
                error: None,
                elapsed: Duration::ZERO,
            }
        }

        async fn post(&self, _path: &str, body: &str, _headers: Option<&Headers>) -> HttpResponse {
            HttpResponse {
                status: 200,
                body: body.to_string(),
                error: None,
                elapsed: Duration::ZERO,
            }
        }

        async fn delete(&self, _path: &str, _body: &str, _headers: Option<&Headers>) -> HttpResponse {
            HttpResponse::default()
        }
    }

    #[tokio::test]
    async fn test_async_engine_delivers_once() {
        let engine = AsyncEngine::new(Arc::new(EchoTransport));
        let (tx, rx) = std::sync::mpsc::channel();

        engine.get_async(
            "/book?token_id=1",
            None,
            Box::new(move |response| {
                tx.send(response.body).unwrap();
            }),
        );

        // Wait for the completion to drain.
        let mut waited = 0;
        while engine.pending_async() > 0 && waited < 100 {
            engine.poll_async(Duration::from_millis(10)).await;
            waited += 1;
        }

        assert_eq!(rx.recv().unwrap(), "/book?token_id=1");
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.pending_async(), 0);
    }

    #[tokio::test]
    async fn test_poll_async_idle_returns_zero() {
        let engine = AsyncEngine::new(Arc::new(EchoTransport));
        assert_eq!(engine.poll_async(Duration::from_millis(5)).await, 0);
    }
}
