// ABOUTME: Error types for the extraction engine including ErrorCode enum and ExtractError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing the different ways an extraction can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A required selector matched nothing.
    NotFound,
    /// Text could not be read as a number after separator and dash handling.
    MalformedNumber,
    /// Text could not be read as a URL, or resolution against a base failed.
    MalformedUrl,
    /// The page fetch collaborator failed.
    Fetch,
    /// The fetched body could not be turned into a document tree.
    Markup,
    /// A selector string could not be compiled.
    Compile,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::NotFound => "not found",
            ErrorCode::MalformedNumber => "malformed number",
            ErrorCode::MalformedUrl => "malformed URL",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Markup => "markup error",
            ErrorCode::Compile => "selector compile error",
        };
        write!(f, "{}", s)
    }
}

/// The error type shared by every operation in this crate.
///
/// `target` names what was being read when the failure happened: a selector,
/// a field name attached by a page parser, or a URL for fetch failures.
/// Aggregation failures also record the page index.
#[derive(Debug, thiserror::Error)]
pub struct ExtractError {
    pub code: ErrorCode,
    pub target: String,
    pub field: Option<String>,
    pub page: Option<u64>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extract:")?;
        if let Some(page) = self.page {
            write!(f, " page {}:", page)?;
        }
        if let Some(ref field) = self.field {
            write!(f, " field '{}':", field)?;
        }
        write!(f, " {} '{}'", self.code, self.target)?;
        if let Some(ref src) = self.source {
            write!(f, ": {:#}", src)?;
        }
        Ok(())
    }
}

impl ExtractError {
    fn new(code: ErrorCode, target: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code,
            target: target.into(),
            field: None,
            page: None,
            source,
        }
    }

    /// Create a NotFound error for the selector that matched nothing.
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, target, None)
    }

    /// Create a MalformedNumber error.
    pub fn malformed_number(target: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::MalformedNumber, target, source)
    }

    /// Create a MalformedUrl error.
    pub fn malformed_url(target: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::MalformedUrl, target, source)
    }

    /// Create a Fetch error.
    pub fn fetch(url: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Fetch, url, source)
    }

    /// Create a Markup error.
    pub fn markup(url: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Markup, url, source)
    }

    /// Create a Compile error.
    pub fn compile(selector: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Compile, selector, source)
    }

    /// Attach the name of the record field that was being read.
    ///
    /// Page parsers call this on required-field failures so the final error
    /// says which field broke the parse, not just which selector.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach the index of the listing page that failed.
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Re-targets a value-level error at the selector the value came from.
    ///
    /// The offending value moves into the source chain so the message still
    /// shows it.
    pub(crate) fn in_selector(mut self, selector: &str) -> Self {
        let value = std::mem::replace(&mut self.target, selector.to_string());
        let detail = match self.source.take() {
            Some(src) => src.context(format!("value '{}'", value)),
            None => anyhow::anyhow!("value '{}'", value),
        };
        self.source = Some(detail);
        self
    }

    /// Returns true if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// Returns true if this is a MalformedNumber error.
    pub fn is_malformed_number(&self) -> bool {
        self.code == ErrorCode::MalformedNumber
    }

    /// Returns true if this is a MalformedUrl error.
    pub fn is_malformed_url(&self) -> bool {
        self.code == ErrorCode::MalformedUrl
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a Markup error.
    pub fn is_markup(&self) -> bool {
        self.code == ErrorCode::Markup
    }

    /// Returns true if this is a Compile error.
    pub fn is_compile(&self) -> bool {
        self.code == ErrorCode::Compile
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
