// ABOUTME: Parsed page wrapper pairing a scraper document tree with the URL it was fetched from.
// ABOUTME: Decodes fetched bytes to text and rejects bodies with no markup in them.

use encoding_rs::Encoding;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{ExtractError, Result};
use crate::resource::{decode, FetchResult};

/// A parsed HTML page and the base URL relative links resolve against.
///
/// Not `Send`: parse a page and pull its records out before the next await.
pub struct Page {
    html: Html,
    url: Url,
    encoding: &'static Encoding,
}

impl Page {
    /// Decodes `body` (charset from `content_type`, else detected) and parses
    /// it as a full document.
    pub fn parse(body: &[u8], content_type: Option<&str>, url: Url) -> Result<Self> {
        let decoded = decode(body, content_type);
        Self::build(&decoded.text, url, decoded.encoding)
    }

    /// Parses already-decoded markup.
    pub fn from_html(markup: &str, url: Url) -> Result<Self> {
        Self::build(markup, url, encoding_rs::UTF_8)
    }

    fn build(markup: &str, url: Url, encoding: &'static Encoding) -> Result<Self> {
        if markup.trim().is_empty() {
            return Err(ExtractError::markup(
                url.as_str(),
                Some(anyhow::anyhow!("empty document")),
            ));
        }
        Ok(Self {
            html: Html::parse_document(markup),
            url,
            encoding,
        })
    }

    /// Parses a fetch result. Relative links resolve against the final URL,
    /// after redirects.
    pub fn from_fetch(result: &FetchResult) -> Result<Self> {
        let url = Url::parse(&result.final_url).map_err(|e| {
            ExtractError::markup(
                result.url.as_str(),
                Some(anyhow::Error::new(e).context(format!("bad final URL '{}'", result.final_url))),
            )
        })?;
        Self::parse(&result.body, result.content_type.as_deref(), url)
    }

    /// The `<html>` element; the usual context for top-level reads.
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Name of the charset the body was decoded with, declared or detected.
    pub fn charset(&self) -> &'static str {
        self.encoding.name()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url.as_str())
            .field("charset", &self.charset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::compiled::QueryCache;
    use crate::extractors::select::Accessor;

    fn listing_url() -> Url {
        Url::parse("https://mods.example.com/members/alice/projects").unwrap()
    }

    #[test]
    fn parses_and_reads_root() {
        let page = Page::from_html(
            "<html><body><h2 class=\"name\">Thaumic Addons</h2></body></html>",
            listing_url(),
        )
        .unwrap();
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        assert_eq!(
            acc.string(page.root(), "h2.name").unwrap().as_deref(),
            Some("Thaumic Addons")
        );
        assert_eq!(page.url(), &listing_url());
    }

    #[test]
    fn empty_body_is_markup_error() {
        let err = Page::parse(b"  \n\t ", None, listing_url()).unwrap_err();
        assert!(err.is_markup());
        assert_eq!(err.target, listing_url().as_str());
    }

    #[test]
    fn decodes_declared_charset() {
        let body: &[u8] = b"<html><body><p>caf\xe9</p></body></html>";
        let page = Page::parse(body, Some("text/html; charset=ISO-8859-1"), listing_url()).unwrap();
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        assert_eq!(acc.string(page.root(), "p").unwrap().as_deref(), Some("café"));
        assert_eq!(page.charset(), "windows-1252");
    }

    #[test]
    fn reports_detected_charset() {
        let page = Page::parse("<p>Ünïcödé</p>".as_bytes(), None, listing_url()).unwrap();
        assert_eq!(page.charset(), "UTF-8");
        let page = Page::from_html("<p>x</p>", listing_url()).unwrap();
        assert_eq!(page.charset(), "UTF-8");
    }

    #[test]
    fn from_fetch_uses_final_url() {
        let requested = listing_url();
        let mut result = FetchResult::html(&requested, "<html><body><a href=\"x\">x</a></body></html>");
        result.final_url = "https://mods.example.com/members/alice/projects/".to_string();
        let page = Page::from_fetch(&result).unwrap();
        assert_eq!(page.url().path(), "/members/alice/projects/");

        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        let link = acc.url_with_base(page.root(), "a @href", page.url()).unwrap();
        assert_eq!(link.path(), "/members/alice/projects/x");
    }

    #[test]
    fn from_fetch_rejects_bad_final_url() {
        let mut result = FetchResult::html(&listing_url(), "<p>x</p>");
        result.final_url = "not a url".to_string();
        assert!(Page::from_fetch(&result).unwrap_err().is_markup());
    }
}
