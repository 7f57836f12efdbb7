use reqwest::{Client, Request, RequestBuilder, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};
use tracing::debug;

/// Counters for upstream traffic, shared by every guard of one manager.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    pub total_requests: AtomicU64,
    /// Answered with a 2xx status
    pub successful_requests: AtomicU64,
    /// Transport failure or non-2xx status
    pub failed_requests: AtomicU64,
    /// Permits currently held
    pub active_requests: AtomicUsize,
    pub peak_concurrent: AtomicUsize,
}

impl RequestMetrics {
    /// One-line view for logs.
    pub fn summary(&self) -> String {
        format!(
            "upstream requests={} ok={} failed={} active={} peak={}",
            self.total_requests.load(Ordering::Relaxed),
            self.successful_requests.load(Ordering::Relaxed),
            self.failed_requests.load(Ordering::Relaxed),
            self.active_requests.load(Ordering::Relaxed),
            self.peak_concurrent.load(Ordering::Relaxed),
        )
    }

    fn record(&self, result: &Result<Response, reqwest::Error>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            Ok(response) if response.status().is_success() => &self.successful_requests,
            _ => &self.failed_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared outbound HTTP client with a concurrency limit.
///
/// Every upstream call (bootstrap, synthesis, voice catalog) goes through one
/// `ReqManager`, so all of them share a connection pool, carry the configured
/// timeouts and count against the same concurrency budget.
///
/// # Example
/// ```rust,no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// use voxrelay::utils::req_manager::ReqManager;
///
/// let manager = ReqManager::new(10)?;
///
/// let guard = manager.acquire().await?;
/// let response = guard.send(guard.client().get("https://api.example.com/data")).await?;
///
/// println!("Metrics: {}", manager.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct ReqManager {
    /// Maximum number of concurrent requests allowed
    max_concurrent_requests: usize,

    /// A single, long-lived HTTP client with connection pooling
    client: Arc<Client>,

    /// Semaphore to control concurrent access to clients
    semaphore: Arc<Semaphore>,

    /// Performance metrics
    metrics: Arc<RequestMetrics>,
}

/// A permit to use the shared client. Releases its concurrency slot when
/// dropped.
pub struct ClientGuard<'a> {
    manager: &'a ReqManager,
    client: Arc<Client>,
    _permit: SemaphorePermit<'a>,
    request_start: Instant,
}

impl<'a> ClientGuard<'a> {
    /// Get the HTTP client for making requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request built from [`ClientGuard::client`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        let result = request.send().await;
        self.manager.metrics.record(&result);
        result
    }

    /// Execute an already built request.
    pub async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        let result = self.client.execute(request).await;
        self.manager.metrics.record(&result);
        result
    }
}

impl<'a> Drop for ClientGuard<'a> {
    fn drop(&mut self) {
        self.manager
            .metrics
            .active_requests
            .fetch_sub(1, Ordering::Relaxed);
        debug!(
            held_ms = self.request_start.elapsed().as_millis() as u64,
            "Released HTTP client permit"
        );
    }
}

/// Configuration for the HTTP request manager
#[derive(Debug, Clone)]
pub struct ReqManagerConfig {
    /// Maximum number of concurrent requests
    pub max_concurrent_requests: usize,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// TCP keep-alive duration
    pub tcp_keepalive: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout, covering the whole exchange including the body
    pub request_timeout: Duration,
}

impl Default for ReqManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            pool_max_idle_per_host: 32,
            tcp_keepalive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ReqManager {
    /// Create a new request manager with the specified maximum concurrent requests
    pub fn new(
        max_concurrent_requests: usize,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config = ReqManagerConfig {
            max_concurrent_requests,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create a new request manager with custom configuration
    ///
    /// # Example
    /// ```no_run
    /// # fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// use std::time::Duration;
    /// use voxrelay::utils::req_manager::{ReqManager, ReqManagerConfig};
    ///
    /// let config = ReqManagerConfig {
    ///     request_timeout: Duration::from_secs(10),
    ///     ..Default::default()
    /// };
    /// let manager = ReqManager::with_config(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config(
        config: ReqManagerConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if config.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be greater than 0".into());
        }
        if config.max_concurrent_requests > 1000 {
            return Err("max_concurrent_requests must not exceed 1000".into());
        }

        let client = Arc::new(Self::create_client(&config)?);

        Ok(Self {
            max_concurrent_requests: config.max_concurrent_requests,
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    fn create_client(config: &ReqManagerConfig) -> Result<Client, reqwest::Error> {
        Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive)
            .tcp_nodelay(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
    }

    /// Acquire a client, waiting while all concurrency slots are in use.
    ///
    /// Only fails if the manager has been closed.
    pub async fn acquire(&self) -> Result<ClientGuard<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;

        let active = self.metrics.active_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_concurrent
            .fetch_max(active, Ordering::Relaxed);

        Ok(ClientGuard {
            manager: self,
            client: Arc::clone(&self.client),
            _permit: permit,
            request_start: Instant::now(),
        })
    }

    /// Get the metrics for this manager
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Maximum number of concurrent requests
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Number of concurrency slots currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
