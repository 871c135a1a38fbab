// ABOUTME: Compiled selector queries and the thread-safe cache that memoizes them by source text.
// ABOUTME: Eliminates repeated parsing of the fixed selector literals used by page parsers.

//! Selector caching for efficient repeated DOM queries.
//!
//! Selector parsing is expensive relative to the actual DOM matching, and page
//! parsers evaluate the same fixed selector literals for every record of every
//! page. [`QueryCache`] compiles each distinct selector text once and hands out
//! shared [`CompiledQuery`] values afterwards.
//!
//! Selector syntax is a CSS selector, optionally followed by whitespace and
//! `@attr` to read an attribute instead of the element text:
//!
//! - `h1 > a > span` reads the trimmed text of the first match,
//! - `div.avatar-wrapper > a @href` reads the `href` of the first match
//!   carrying one,
//! - `@title` reads the `title` attribute of the context element itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use ego_tree::iter::Descendants;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Node, Selector};
use tracing::trace;

use crate::error::{ExtractError, Result};

/// What a compiled query reads from the elements it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The concatenated, trimmed text content.
    Text,
    /// The trimmed value of the named attribute.
    Attr(String),
}

/// A selector compiled into a reusable form.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    source: String,
    selector: Option<Selector>,
    target: Target,
}

impl CompiledQuery {
    /// Builds a query from already-compiled parts.
    ///
    /// A `None` selector addresses the context element itself.
    pub fn new(source: impl Into<String>, selector: Option<Selector>, target: Target) -> Self {
        Self {
            source: source.into(),
            selector,
            target,
        }
    }

    /// The selector text this query was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// True if `el` carries whatever this query reads.
    fn has_target(&self, el: &ElementRef<'_>) -> bool {
        match &self.target {
            Target::Text => true,
            Target::Attr(name) => el.value().attr(name).is_some(),
        }
    }

    /// Reads the query's target from an element that matched it.
    pub fn value_of(&self, el: &ElementRef<'_>) -> Option<String> {
        match &self.target {
            Target::Text => Some(el.text().collect::<String>().trim().to_string()),
            Target::Attr(name) => el.value().attr(name).map(|v| v.trim().to_string()),
        }
    }

    /// Evaluates the query against `scope`, lazily yielding matching elements
    /// in document order.
    pub fn evaluate<'a>(self: &Arc<Self>, scope: ElementRef<'a>) -> Nodes<'a> {
        let state = match self.selector {
            None => State::Context { done: false },
            Some(_) => {
                let root: ego_tree::NodeRef<'a, Node> = *scope;
                let mut descendants = root.descendants();
                // Descendants starts with the scope node itself.
                descendants.next();
                State::Descendants(descendants)
            }
        };
        Nodes {
            query: Arc::clone(self),
            scope,
            state,
        }
    }
}

enum State<'a> {
    Context { done: bool },
    Descendants(Descendants<'a, Node>),
}

/// Lazy iterator over the elements a [`CompiledQuery`] matches below a
/// context element.
///
/// Finite, and cheap to restart: each evaluation builds a fresh iterator.
pub struct Nodes<'a> {
    query: Arc<CompiledQuery>,
    scope: ElementRef<'a>,
    state: State<'a>,
}

impl<'a> Nodes<'a> {
    /// The query driving this iterator.
    pub fn query(&self) -> &CompiledQuery {
        &self.query
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            State::Context { done } => {
                if *done {
                    return None;
                }
                *done = true;
                Some(self.scope).filter(|el| self.query.has_target(el))
            }
            State::Descendants(descendants) => {
                let selector = self.query.selector.as_ref()?;
                for node in descendants.by_ref() {
                    let Some(el) = ElementRef::wrap(node) else {
                        continue;
                    };
                    if selector.matches_with_scope(&el, Some(self.scope))
                        && self.query.has_target(&el)
                    {
                        return Some(el);
                    }
                }
                None
            }
        }
    }
}

impl fmt::Debug for Nodes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nodes")
            .field("query", &self.query.source)
            .finish_non_exhaustive()
    }
}

/// Turns selector text into a [`CompiledQuery`].
pub trait QueryCompiler: Send + Sync {
    fn compile(&self, selector: &str) -> Result<CompiledQuery>;
}

/// The default compiler: a CSS selector with an optional `@attr` suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorCompiler;

impl QueryCompiler for SelectorCompiler {
    fn compile(&self, selector: &str) -> Result<CompiledQuery> {
        let (css, target) = split_target(selector);
        let compiled = match css {
            Some(css) => Some(Selector::parse(css).map_err(|e| {
                ExtractError::compile(selector, Some(anyhow::anyhow!("{}", e)))
            })?),
            None => None,
        };
        Ok(CompiledQuery::new(selector, compiled, target))
    }
}

fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Splits `"css @attr"` into its CSS part and target.
///
/// The `@attr` suffix must be the last token and stand on its own, so an `@`
/// inside an attribute selector such as `a[href^='mailto:@']` stays part of
/// the CSS.
fn split_target(selector: &str) -> (Option<&str>, Target) {
    let trimmed = selector.trim();
    if let Some(idx) = trimmed.rfind('@') {
        let (head, attr) = (&trimmed[..idx], &trimmed[idx + 1..]);
        let standalone = head.is_empty() || head.ends_with(char::is_whitespace);
        if standalone && is_attr_name(attr) {
            let css = head.trim();
            let css = if css.is_empty() { None } else { Some(css) };
            return (css, Target::Attr(attr.to_string()));
        }
    }
    (Some(trimmed), Target::Text)
}

static GLOBAL_CACHE: Lazy<Arc<QueryCache>> = Lazy::new(|| Arc::new(QueryCache::new()));

/// Thread-safe cache of compiled queries keyed by their exact selector text.
///
/// Uses a RwLock for read-heavy workloads: almost every access is a hit.
/// Entries are never evicted except by [`clear`](Self::clear).
pub struct QueryCache {
    compiler: Box<dyn QueryCompiler>,
    queries: RwLock<HashMap<String, Arc<CompiledQuery>>>,
}

impl QueryCache {
    /// Creates an empty cache using [`SelectorCompiler`].
    pub fn new() -> Self {
        Self::with_compiler(SelectorCompiler)
    }

    /// Creates an empty cache backed by a custom compiler.
    pub fn with_compiler(compiler: impl QueryCompiler + 'static) -> Self {
        Self {
            compiler: Box::new(compiler),
            queries: RwLock::new(HashMap::new()),
        }
    }

    /// The conventional process-wide cache.
    ///
    /// Nothing in this crate requires it; clients and tests may construct
    /// their own instances.
    pub fn global() -> Arc<QueryCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// Gets or compiles a selector, caching the result.
    ///
    /// Compile failures are returned and not cached. Two threads missing on
    /// the same text at once may both compile it; only the first result is
    /// stored and both callers receive an equivalent query.
    pub fn get_or_compile(&self, selector: &str) -> Result<Arc<CompiledQuery>> {
        // Fast path: shared lock
        {
            let queries = self.queries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = queries.get(selector) {
                return Ok(Arc::clone(cached));
            }
        }

        // Slow path: compile outside the lock, then insert
        trace!(selector, "compiling selector");
        let compiled = Arc::new(self.compiler.compile(selector)?);
        let mut queries = self.queries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = queries
            .entry(selector.to_string())
            .or_insert_with(|| compiled);
        Ok(Arc::clone(entry))
    }

    /// Precompiles a batch of selectors, stopping at the first malformed one.
    pub fn precompile<I, S>(&self, selectors: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for selector in selectors {
            self.get_or_compile(selector.as_ref())?;
        }
        Ok(())
    }

    /// Stores `compiled` under `selector` without compiling anything.
    ///
    /// This is a trusted preload: nothing checks that `compiled` actually
    /// corresponds to `selector`, and later lookups of that text will return
    /// whatever was inserted here. Replaces any existing entry.
    pub fn insert(&self, selector: impl Into<String>, compiled: CompiledQuery) {
        let mut queries = self.queries.write().unwrap_or_else(PoisonError::into_inner);
        queries.insert(selector.into(), Arc::new(compiled));
    }

    /// Drops every cached query.
    pub fn clear(&self) {
        self.queries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
