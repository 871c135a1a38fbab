// ABOUTME: Locale-aware integer parsing and Unix epoch timestamp conversion for scraped labels.
// ABOUTME: Strips thousands separators and reads the site's "-" placeholder as zero.

use chrono::{DateTime, Utc};

use crate::error::{ExtractError, Result};

/// Characters the sites use to group digits in counters.
const THOUSANDS_SEPARATORS: &[char] = &[',', '\u{00a0}', '\u{202f}'];

/// The site renders a zero count as a lone dash.
const ZERO_PLACEHOLDER: &str = "-";

/// Removes surrounding whitespace and every thousands separator.
fn strip_separators(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !THOUSANDS_SEPARATORS.contains(c))
        .collect()
}

/// Parses a locale-formatted non-negative integer such as `"1,234"`.
///
/// `"-"` reads as zero. Anything other than ASCII digits after separator
/// stripping, or a value that overflows `u64`, is a `MalformedNumber` error.
pub fn parse_unsigned(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    if trimmed == ZERO_PLACEHOLDER {
        return Ok(0);
    }

    let digits = strip_separators(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExtractError::malformed_number(
            trimmed,
            Some(anyhow::anyhow!("expected digits")),
        ));
    }

    digits
        .parse::<u64>()
        .map_err(|e| ExtractError::malformed_number(trimmed, Some(e.into())))
}

/// Parses a locale-formatted integer that may carry a leading `+` or `-`.
pub fn parse_signed(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    if trimmed == ZERO_PLACEHOLDER {
        return Ok(0);
    }

    let cleaned = strip_separators(trimmed);
    let unsigned = cleaned
        .strip_prefix(['+', '-'])
        .unwrap_or(cleaned.as_str());
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExtractError::malformed_number(
            trimmed,
            Some(anyhow::anyhow!("expected an optionally signed integer")),
        ));
    }

    cleaned
        .parse::<i64>()
        .map_err(|e| ExtractError::malformed_number(trimmed, Some(e.into())))
}

/// Reads text as seconds since the Unix epoch and returns the UTC instant.
///
/// Errors are always returned; no placeholder instant is substituted.
pub fn parse_unix_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let secs = parse_signed(text)?;
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
        ExtractError::malformed_number(
            text.trim(),
            Some(anyhow::anyhow!("timestamp out of range")),
        )
    })
}

/// Returns the first whitespace-separated token of a label.
///
/// Counter labels look like `"1,234 Downloads"` or `"12 Likes"`; the number
/// is always the leading field.
pub fn leading_field(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}
