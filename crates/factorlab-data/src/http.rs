//! Rate-limited HTTP downloads shared by the Ken French and FRED fetchers.

use crate::error::{DataError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum spacing between requests.
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(250);

const USER_AGENT: &str = "factorlab/0.1 (research; contact@example.com)";

struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// HTTP client with a request timeout and a minimum interval between calls.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client with the default 30 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            timeout,
        })
    }

    /// Request timeout in use.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return the body.
    ///
    /// # Errors
    /// Returns [`DataError::HttpStatus`] for any non-success status.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.rate_limiter.lock().await.wait().await;

        info!(url, "downloading");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DataError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(DataError::Network)?;
        debug!(url, bytes = body.len(), "download complete");
        Ok(body.to_vec())
    }
}
