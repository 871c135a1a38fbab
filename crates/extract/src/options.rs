// ABOUTME: Client configuration: Options and the fluent ClientBuilder.
// ABOUTME: Covers request timeout, user agent, extra headers, a caller-supplied reqwest client and the query cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::Client;
use crate::error::Result;
use crate::extractors::compiled::QueryCache;
use crate::resource::DEFAULT_MAX_BODY_SIZE;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "curse-extract/",
    env!("CARGO_PKG_VERSION"),
    " (compatible; curse-parser)"
);

/// Configuration options for the extraction client.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
    /// Largest page body accepted, in bytes.
    pub max_body_size: usize,
    /// Query cache to share; the process-wide one when unset.
    pub cache: Option<Arc<QueryCache>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_client: None,
            headers: HashMap::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            cache: None,
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Use a custom HTTP client. Timeout and user agent are then the
    /// caller's concern.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Reject page bodies larger than `bytes`.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.opts.max_body_size = bytes;
        self
    }

    /// Use `cache` instead of the process-wide query cache.
    pub fn cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.opts.cache = Some(cache);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Result<Client> {
        Client::new(self.opts)
    }
}
