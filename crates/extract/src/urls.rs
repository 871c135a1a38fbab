// ABOUTME: URL normalization and reference resolution for links scraped from project pages.
// ABOUTME: Schemeless "//host/..." links default to https; relative links resolve against the page URL.

use url::Url;

use crate::error::{ExtractError, Result};

/// Scheme assumed for protocol-relative links.
const DEFAULT_SCHEME: &str = "https";

/// Parses an absolute URL, treating a schemeless `//host/path` form as https.
///
/// The sites emit links such as `//www.curseforge.com/...`; those come back
/// with the `https` scheme. Any other input must be absolute.
pub fn normalize(text: &str) -> Result<Url> {
    let trimmed = text.trim();
    let parsed = if trimmed.starts_with("//") {
        Url::parse(&format!("{}:{}", DEFAULT_SCHEME, trimmed))
    } else {
        Url::parse(trimmed)
    };
    parsed.map_err(|e| ExtractError::malformed_url(trimmed, Some(e.into())))
}

/// Resolves a URL reference against `base`.
///
/// Absolute references come back unchanged. Relative and schemeless
/// references are merged with the base per RFC 3986. The merge keeps the
/// base's scheme, and the base is always absolute, so the result always has
/// a scheme.
pub fn resolve(text: &str, base: &Url) -> Result<Url> {
    let trimmed = text.trim();
    base.join(trimmed)
        .map_err(|e| ExtractError::malformed_url(trimmed, Some(e.into())))
}

/// Like [`resolve`], but takes the base as unparsed text.
///
/// A base that cannot be parsed is reported as a `MalformedUrl` error
/// naming the base.
pub fn resolve_str(text: &str, base: &str) -> Result<Url> {
    let base = normalize(base)?;
    resolve(text, &base)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = "https://mods.example.com/mc-mods/minecraft/238424-taam";

    fn base() -> Url {
        Url::parse(PROJECT).unwrap()
    }

    #[test]
    fn test_normalize_schemeless_defaults_https() {
        let url = normalize("//example.com/x").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.as_str(), "https://example.com/x");
    }

    #[test]
    fn test_normalize_keeps_existing_scheme() {
        let url = normalize("http://example.com/x").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let url = normalize("\n  https://example.com/files  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/files");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize("not a url").unwrap_err();
        assert!(err.is_malformed_url());
        assert!(normalize("/relative/only").unwrap_err().is_malformed_url());
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve("/members/alice", &base()).unwrap();
        assert_eq!(url.as_str(), "https://mods.example.com/members/alice");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve("238424-taam/files", &base()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mods.example.com/mc-mods/minecraft/238424-taam/files"
        );
    }

    #[test]
    fn test_resolve_absolute_reference_unchanged() {
        let url = resolve("https://other.example.com/y", &base()).unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/y");

        let plain = Url::parse("http://plain.example.com/").unwrap();
        let url = resolve("https://other.example.com/y", &plain).unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/y");
    }

    #[test]
    fn test_resolve_schemeless_takes_base_scheme() {
        let url = resolve("//media.example.com/avatar.png", &base()).unwrap();
        assert_eq!(url.as_str(), "https://media.example.com/avatar.png");
    }

    #[test]
    fn test_resolve_query_only() {
        let url = resolve("?page=2", &base()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mods.example.com/mc-mods/minecraft/238424-taam?page=2"
        );
    }

    #[test]
    fn test_resolve_str_propagates_base_failure() {
        let err = resolve_str("/members/alice", "::not a base::").unwrap_err();
        assert!(err.is_malformed_url());
        assert_eq!(err.target, "::not a base::");
    }

    #[test]
    fn test_resolve_str_ok() {
        let url = resolve_str("/members/alice", PROJECT).unwrap();
        assert_eq!(url.as_str(), "https://mods.example.com/members/alice");
    }
}
