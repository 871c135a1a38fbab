// ABOUTME: Typed field accessors that evaluate cached selectors against a context element.
// ABOUTME: Exposes string, node, iterator, URL, integer and timestamp reads with explicit presence semantics.

//! Selector-based typed field reads.
//!
//! Every accessor resolves its selector through a [`QueryCache`] and then
//! evaluates it relative to a context element. Two families of results:
//!
//! - `string`, `node` and `iter` report absence as `None` (or an empty
//!   iterator) and only fail if the selector itself does not compile.
//! - `url`, `url_with_base`, `unsigned_int`, `signed_int` and
//!   `unix_timestamp` treat absence as a `NotFound` error and unreadable text
//!   as `MalformedUrl` / `MalformedNumber`.
//!
//! Errors from this layer name the selector that failed; page parsers attach
//! the record field with [`ExtractError::with_field`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scraper::ElementRef;
use url::Url;

use crate::error::{ExtractError, Result};
use crate::extractors::compiled::{CompiledQuery, Nodes, QueryCache};
use crate::numeric::{parse_signed, parse_unix_timestamp, parse_unsigned};
use crate::urls::{normalize, resolve};

/// Typed, presence-checked reads over a [`QueryCache`].
///
/// Cheap to copy; holds only a reference to the cache.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'c> {
    cache: &'c QueryCache,
}

impl<'c> Accessor<'c> {
    pub fn new(cache: &'c QueryCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &'c QueryCache {
        self.cache
    }

    fn query(&self, selector: &str) -> Result<Arc<CompiledQuery>> {
        self.cache.get_or_compile(selector)
    }

    /// Trimmed text (or attribute value) of the first match.
    pub fn string(&self, context: ElementRef<'_>, selector: &str) -> Result<Option<String>> {
        let query = self.query(selector)?;
        let value = query
            .evaluate(context)
            .next()
            .and_then(|el| query.value_of(&el));
        Ok(value)
    }

    /// First element matching the selector.
    pub fn node<'a>(&self, context: ElementRef<'a>, selector: &str) -> Result<Option<ElementRef<'a>>> {
        Ok(self.query(selector)?.evaluate(context).next())
    }

    /// All elements matching the selector, in document order.
    ///
    /// The iterator is lazy; call again to restart from the first match.
    pub fn iter<'a>(&self, context: ElementRef<'a>, selector: &str) -> Result<Nodes<'a>> {
        Ok(self.query(selector)?.evaluate(context))
    }

    /// Like [`string`](Self::string), but absence is a `NotFound` error.
    pub fn required_string(&self, context: ElementRef<'_>, selector: &str) -> Result<String> {
        self.string(context, selector)?
            .ok_or_else(|| ExtractError::not_found(selector))
    }

    /// Absolute URL read from the first match.
    ///
    /// Schemeless `//host/...` values are given the https scheme.
    pub fn url(&self, context: ElementRef<'_>, selector: &str) -> Result<Url> {
        let text = self.required_string(context, selector)?;
        normalize(&text).map_err(|e| e.in_selector(selector))
    }

    /// URL read from the first match and resolved against `base`.
    pub fn url_with_base(&self, context: ElementRef<'_>, selector: &str, base: &Url) -> Result<Url> {
        let text = self.required_string(context, selector)?;
        resolve(&text, base).map_err(|e| e.in_selector(selector))
    }

    /// Like [`url_with_base`](Self::url_with_base) with the base as text.
    ///
    /// The base is parsed before the selector is evaluated, so a bad base is
    /// reported even when the field is missing.
    pub fn url_with_base_str(&self, context: ElementRef<'_>, selector: &str, base: &str) -> Result<Url> {
        let base = normalize(base)?;
        let text = self.required_string(context, selector)?;
        resolve(&text, &base).map_err(|e| e.in_selector(selector))
    }

    pub fn unsigned_int(&self, context: ElementRef<'_>, selector: &str) -> Result<u64> {
        let text = self.required_string(context, selector)?;
        parse_unsigned(&text).map_err(|e| e.in_selector(selector))
    }

    pub fn signed_int(&self, context: ElementRef<'_>, selector: &str) -> Result<i64> {
        let text = self.required_string(context, selector)?;
        parse_signed(&text).map_err(|e| e.in_selector(selector))
    }

    /// Unix epoch seconds read from the first match, as a UTC instant.
    ///
    /// Failures are returned as-is; choosing a fallback instant is up to the
    /// caller.
    pub fn unix_timestamp(&self, context: ElementRef<'_>, selector: &str) -> Result<DateTime<Utc>> {
        let text = self.required_string(context, selector)?;
        parse_unix_timestamp(&text).map_err(|e| e.in_selector(selector))
    }
}
