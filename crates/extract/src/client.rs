// ABOUTME: The Client that fetches pages over HTTP and hands them to page parsers with a shared query cache.
// ABOUTME: Implements PageFetcher so listings can be aggregated straight from the network.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::document::Page;
use crate::error::{ExtractError, Result};
use crate::extractors::compiled::QueryCache;
use crate::extractors::select::Accessor;
use crate::options::{ClientBuilder, Options};
use crate::paginate::{self, ListingParser, PaginationOptions};
use crate::resource::{fetch, FetchOptions, FetchResult, PageFetcher};

/// HTTP front end for the extraction engine.
///
/// Cloning is cheap; clones share the connection pool and query cache.
#[derive(Debug, Clone)]
pub struct Client {
    fetch_opts: FetchOptions,
    http_client: reqwest::Client,
    cache: Arc<QueryCache>,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Result<Self> {
        let http_client = match opts.http_client.clone() {
            Some(client) => client,
            None => reqwest::Client::builder()
                .user_agent(&opts.user_agent)
                .timeout(opts.timeout)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .map_err(|e| {
                    ExtractError::fetch("http client", Some(anyhow::Error::new(e).context("failed to build")))
                })?,
        };
        let cache = opts.cache.clone().unwrap_or_else(QueryCache::global);
        let fetch_opts = FetchOptions {
            headers: opts.headers,
            max_body_size: opts.max_body_size,
        };

        Ok(Self {
            fetch_opts,
            http_client,
            cache,
        })
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Typed reads over this client's query cache.
    pub fn accessor(&self) -> Accessor<'_> {
        Accessor::new(&self.cache)
    }

    /// Fetches and parses a single page.
    pub async fn page(&self, url: &Url) -> Result<Page> {
        let fetched = self.fetch_page(url).await?;
        Page::from_fetch(&fetched)
    }

    /// Fetches and parses a single page from a URL string.
    pub async fn page_str(&self, url: &str) -> Result<Page> {
        let url = Url::parse(url)
            .map_err(|e| ExtractError::malformed_url(url, Some(e.into())))?;
        self.page(&url).await
    }

    /// Walks every page of a listing with `parser`.
    pub async fn aggregate<P: ListingParser>(
        &self,
        listing: &Url,
        parser: &P,
        opts: &PaginationOptions,
    ) -> Result<Vec<P::Record>> {
        paginate::aggregate(self, &self.cache, listing, parser, opts).await
    }
}

impl PageFetcher for Client {
    async fn fetch_page(&self, url: &Url) -> Result<FetchResult> {
        let result = fetch(&self.http_client, url, &self.fetch_opts).await?;
        if result.final_url != result.url {
            debug!(from = %result.url, to = %result.final_url, "followed redirect");
        }
        Ok(result)
    }
}
