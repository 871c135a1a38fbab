// ABOUTME: Declarative field descriptors that pair a record field with its selector and presence policy.
// ABOUTME: The accessor consumes them uniformly: required fields fail loudly, optional ones yield None.

//! Field descriptors.
//!
//! A page parser declares each field once:
//!
//! ```
//! use curse_extract::Field;
//!
//! const TITLE: Field = Field::required("Title", "section.atf h1 > a > span");
//! const WIKI_URL: Field = Field::optional("Wiki URL", "nav li > a.wiki @href");
//! ```
//!
//! and reads it with the `read_*` methods on [`Accessor`]. Absence of an
//! optional field resolves to `None`. Absence of a required field is a
//! `NotFound` error carrying the field name. A value that is present but
//! unreadable is an error for both kinds, so a broken optional field is never
//! mistaken for a missing one.

use chrono::{DateTime, Utc};
use scraper::ElementRef;
use url::Url;

use crate::error::Result;
use crate::extractors::select::Accessor;

/// Whether a field must be present for the parse to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// A record field: its name for error reporting, its selector, and its
/// presence policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub selector: &'static str,
    pub presence: Presence,
}

impl Field {
    pub const fn required(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector,
            presence: Presence::Required,
        }
    }

    pub const fn optional(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector,
            presence: Presence::Optional,
        }
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Applies the presence policy to a raw accessor result.
    fn settle<T>(&self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() && !self.is_required() => Ok(None),
            Err(e) => Err(e.with_field(self.name)),
        }
    }
}

impl Accessor<'_> {
    /// Reads a text field. Required fields never come back as `None`.
    pub fn read_string(&self, context: ElementRef<'_>, field: &Field) -> Result<Option<String>> {
        field.settle(self.required_string(context, field.selector))
    }

    /// Reads a text field, substituting an empty string for an absent
    /// optional one.
    pub fn read_string_or_default(&self, context: ElementRef<'_>, field: &Field) -> Result<String> {
        Ok(self.read_string(context, field)?.unwrap_or_default())
    }

    /// Reads a URL field resolved against `base`.
    pub fn read_url(&self, context: ElementRef<'_>, field: &Field, base: &Url) -> Result<Option<Url>> {
        field.settle(self.url_with_base(context, field.selector, base))
    }

    pub fn read_unsigned(&self, context: ElementRef<'_>, field: &Field) -> Result<Option<u64>> {
        field.settle(self.unsigned_int(context, field.selector))
    }

    pub fn read_signed(&self, context: ElementRef<'_>, field: &Field) -> Result<Option<i64>> {
        field.settle(self.signed_int(context, field.selector))
    }

    pub fn read_timestamp(
        &self,
        context: ElementRef<'_>,
        field: &Field,
    ) -> Result<Option<DateTime<Utc>>> {
        field.settle(self.unix_timestamp(context, field.selector))
    }

    /// True if the field's selector matches anything below `context`.
    pub fn has(&self, context: ElementRef<'_>, field: &Field) -> Result<bool> {
        Ok(self.node(context, field.selector)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::compiled::QueryCache;
    use scraper::Html;

    const NAV_HTML: &str = r#"
        <html><body>
            <nav class="e-header-nav">
                <ul>
                    <li><a class="overview" href="/projects/taam">Overview</a></li>
                    <li><a class="files" href="/projects/taam/files">Files</a></li>
                    <li><a class="source" href="http://[broken">Source</a></li>
                </ul>
            </nav>
            <ul class="project-details">
                <li class="downloads">512,000</li>
                <li class="likes">many</li>
                <li class="created"><abbr data-epoch="1489276800"></abbr></li>
            </ul>
        </body></html>
    "#;

    const OVERVIEW_URL: Field = Field::required("Overview URL", "nav a.overview @href");
    const WIKI_URL: Field = Field::optional("Wiki URL", "nav a.wiki @href");
    const SOURCE_URL: Field = Field::optional("Source URL", "nav a.source @href");
    const ISSUES_URL: Field = Field::required("Issues URL", "nav a.issues @href");
    const TOTAL_DOWNLOADS: Field = Field::required("TotalDownloads", "li.downloads");
    const LIKES: Field = Field::optional("Likes", "li.likes");
    const DONATION: Field = Field::optional("Donation", "a.donate");
    const CREATED: Field = Field::required("Created", "li.created abbr @data-epoch");

    fn base() -> Url {
        Url::parse("https://minecraft.example.com/projects/taam").unwrap()
    }

    #[test]
    fn test_required_field_present() {
        let doc = Html::parse_document(NAV_HTML);
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        let url = acc.read_url(doc.root_element(), &OVERVIEW_URL, &base()).unwrap();
        assert_eq!(
            url.map(String::from),
            Some("https://minecraft.example.com/projects/taam".to_string())
        );
    }

    #[test]
    fn test_required_field_missing_names_field() {
        let doc = Html::parse_document(NAV_HTML);
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        let err = acc.read_url(doc.root_element(), &ISSUES_URL, &base()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.field.as_deref(), Some("Issues URL"));
    }

    #[test]
    fn test_optional_field_missing_is_none() {
        let doc = Html::parse_document(NAV_HTML);
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        assert_eq!(acc.read_url(doc.root_element(), &WIKI_URL, &base()).unwrap(), None);
        assert_eq!(acc.read_string(doc.root_element(), &DONATION).unwrap(), None);
        assert_eq!(
            acc.read_string_or_default(doc.root_element(), &DONATION).unwrap(),
            ""
        );
    }

    #[test]
    fn test_optional_field_malformed_still_fails() {
        let doc = Html::parse_document(NAV_HTML);
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);

        let err = acc.read_url(doc.root_element(), &SOURCE_URL, &base()).unwrap_err();
        assert!(err.is_malformed_url());
        assert_eq!(err.field.as_deref(), Some("Source URL"));

        let err = acc.read_unsigned(doc.root_element(), &LIKES).unwrap_err();
        assert!(err.is_malformed_number());
        assert_eq!(err.field.as_deref(), Some("Likes"));
    }

    #[test]
    fn test_numeric_and_timestamp_fields() {
        let doc = Html::parse_document(NAV_HTML);
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        let root = doc.root_element();

        assert_eq!(acc.read_unsigned(root, &TOTAL_DOWNLOADS).unwrap(), Some(512_000));
        assert_eq!(acc.read_signed(root, &TOTAL_DOWNLOADS).unwrap(), Some(512_000));
        let created = acc.read_timestamp(root, &CREATED).unwrap().unwrap();
        assert_eq!(created.timestamp(), 1_489_276_800);
    }

    #[test]
    fn test_has() {
        let doc = Html::parse_document(NAV_HTML);
        let cache = QueryCache::new();
        let acc = Accessor::new(&cache);
        assert!(acc.has(doc.root_element(), &OVERVIEW_URL).unwrap());
        assert!(!acc.has(doc.root_element(), &WIKI_URL).unwrap());
    }
}
