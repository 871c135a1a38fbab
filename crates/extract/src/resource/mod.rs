// ABOUTME: Page fetching collaborator: the PageFetcher trait plus the reqwest-backed GET the Client uses.
// ABOUTME: Enforces 200-only responses and a configurable body cap, and decodes bodies to text by charset.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use encoding_rs::Encoding;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ExtractError, Result};

/// Default cap on a page body (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Per-request settings derived from the client options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    /// Bodies larger than this many bytes are rejected.
    pub max_body_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// A fully read 200 response.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested.
    pub url: String,
    /// The URL that answered, after redirects.
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Builds a response in memory; used by fetchers that do not talk HTTP.
    pub fn html(url: &Url, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }
}

/// Fetches one page. Implementations fully consume the response body before
/// returning.
///
/// The crate's [`Client`](crate::Client) implements this over HTTP; tests and
/// callers with their own transport provide other implementations.
pub trait PageFetcher {
    fn fetch_page(&self, url: &Url) -> impl Future<Output = Result<FetchResult>> + Send;
}

/// Body text and the encoding it was read with.
pub(crate) struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Decodes a body with the charset its content type declares, falling back
/// to detection when there is none or the label is unknown.
pub(crate) fn decode(body: &[u8], content_type: Option<&str>) -> Decoded {
    let encoding = content_type
        .and_then(declared_encoding)
        .unwrap_or_else(|| sniff_encoding(body));
    let (text, _, _) = encoding.decode(body);
    Decoded {
        text: text.into_owned(),
        encoding,
    }
}

/// The encoding named by a `charset=` parameter, if it is one we know.
fn declared_encoding(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes())
    })
}

fn sniff_encoding(body: &[u8]) -> &'static Encoding {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    detector.guess(None, true)
}

fn fetch_error(url: &Url, source: anyhow::Error) -> ExtractError {
    ExtractError::fetch(url.as_str(), Some(source))
}

fn too_large(url: &Url, size: u64, limit: usize) -> ExtractError {
    fetch_error(
        url,
        anyhow::anyhow!("body of {} bytes exceeds the {} byte limit", size, limit),
    )
}

/// Fetches `url` with a single GET.
///
/// Anything but a 200 is a `Fetch` error, as is a body over
/// `opts.max_body_size`, whether announced by Content-Length or found after
/// reading.
#[instrument(skip(client, url, opts), fields(url = %url))]
pub async fn fetch(client: &reqwest::Client, url: &Url, opts: &FetchOptions) -> Result<FetchResult> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(fetch_error(
            url,
            anyhow::anyhow!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    let request = opts
        .headers
        .iter()
        .fold(client.get(url.clone()), |req, (key, value)| req.header(key, value));
    let response = request
        .send()
        .await
        .map_err(|e| fetch_error(url, anyhow::Error::new(e).context("request failed")))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(fetch_error(url, anyhow::anyhow!("HTTP status {}", status.as_u16())));
    }

    let limit = opts.max_body_size as u64;
    if let Some(announced) = response.content_length().filter(|&len| len > limit) {
        return Err(too_large(url, announced, opts.max_body_size));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase);

    let body = response
        .bytes()
        .await
        .map_err(|e| fetch_error(url, anyhow::Error::new(e).context("reading body")))?;
    if body.len() as u64 > limit {
        return Err(too_large(url, body.len() as u64, opts.max_body_size));
    }

    debug!(bytes = body.len(), final_url = %final_url, "fetched page");
    Ok(FetchResult {
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn fetch_reads_body_and_content_type() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/projects/taam");
                then.status(200)
                    .header("content-type", "Text/HTML; Charset=UTF-8")
                    .body("<p>hello</p>");
            })
            .await;

        let url = Url::parse(&server.url("/projects/taam")).unwrap();
        let result = fetch(&test_client(), &url, &FetchOptions::default())
            .await
            .expect("fetch should succeed");
        mock.assert_async().await;

        assert_eq!(&result.body[..], b"<p>hello</p>");
        assert_eq!(result.final_url, url.as_str());
        assert_eq!(result.content_type.as_deref(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn fetch_rejects_non_200() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/notfound");
                then.status(404).body("not found");
            })
            .await;

        let url = Url::parse(&server.url("/notfound")).unwrap();
        let err = fetch(&test_client(), &url, &FetchOptions::default())
            .await
            .expect_err("404 is a failure");
        mock.assert_async().await;

        assert!(err.is_fetch());
        assert_eq!(err.target, url.as_str());
        assert!(err.to_string().ends_with("HTTP status 404"));
    }

    #[tokio::test]
    async fn fetch_rejects_body_over_limit() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/huge");
                then.status(200).body("x".repeat(64));
            })
            .await;

        let url = Url::parse(&server.url("/huge")).unwrap();
        let opts = FetchOptions {
            max_body_size: 16,
            ..Default::default()
        };
        let err = fetch(&test_client(), &url, &opts)
            .await
            .expect_err("body is over the cap");
        assert!(err.is_fetch());
        assert!(err.to_string().contains("64 bytes exceeds the 16 byte limit"));
    }

    #[tokio::test]
    async fn fetch_rejects_non_http_scheme() {
        let url = Url::parse("ftp://mods.example.com/taam.zip").unwrap();
        let err = fetch(&test_client(), &url, &FetchOptions::default())
            .await
            .expect_err("ftp is not fetched");
        assert!(err.is_fetch());
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn decode_uses_declared_charset() {
        // "café" in ISO-8859-1
        let decoded = decode(&[0x63, 0x61, 0x66, 0xe9], Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "café");
        assert_eq!(decoded.encoding, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn decode_detects_when_undeclared() {
        let decoded = decode("<p>naïve</p>".as_bytes(), Some("text/html"));
        assert_eq!(decoded.text, "<p>naïve</p>");
        assert_eq!(decoded.encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn declared_encoding_parameters() {
        assert_eq!(declared_encoding("text/html; charset=utf-8"), Some(encoding_rs::UTF_8));
        assert_eq!(
            declared_encoding("text/html;CHARSET=\"Shift_JIS\""),
            Some(encoding_rs::SHIFT_JIS)
        );
        assert_eq!(declared_encoding("text/html; charset=no-such-charset"), None);
        assert_eq!(declared_encoding("text/html"), None);
        assert_eq!(declared_encoding("charset=utf-8"), None);
    }
}
