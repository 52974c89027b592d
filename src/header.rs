//! Structured header value parsing.
//!
//! Negotiation headers ("Accept-Language", "Accept", ...) share one grammar:
//! a comma-separated list of values, each optionally followed by
//! semicolon-separated `key=value` parameters, with a `q` parameter weighting
//! the value between 0 and 1. This module tokenizes that grammar without ever
//! rejecting input (malformed pieces degrade to defaults instead of failing)
//! and returns entries sorted by weight so callers can walk candidates
//! best-first.

use std::collections::HashMap;

/// One parsed item from a structured header value.
///
/// The value token is carried through as opaque text: it is never validated,
/// so structurally broken media-type-like input survives parsing unchanged.
/// `params` keeps the raw trimmed string for every parameter, including the
/// literal `q` text that `quality` was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEntry {
    /// The leading value token of the entry (e.g. `en-US` or `text/html`).
    pub value: String,

    /// Accepted `key=value` parameters, keys compared case-sensitively.
    pub params: HashMap<String, String>,

    /// Weight derived from the `q` parameter, always finite and in `[0, 1]`.
    pub quality: f64,
}

/// Parse a raw header value into entries sorted by descending quality.
///
/// Splitting on `,` (entries) and `;` (parameters) is quote-aware: a `"` or
/// `'` opens a quoted span closed by the next occurrence of the same quote
/// character, and delimiters inside the span do not split. Quoted content is
/// carried through verbatim, quote characters included.
///
/// A parameter chunk is accepted only when it contains exactly one `=` and a
/// non-empty key; anything else is dropped without affecting the rest of the
/// entry. When a key repeats within one entry, the last valid occurrence
/// wins.
///
/// The sort is stable: entries with equal quality keep their original
/// left-to-right order.
///
/// # Arguments
/// * `raw` - The header value, or `None` when the header was absent
///
/// # Returns
/// The parsed entries, best quality first. Absent or empty input yields an
/// empty vector; no input ever causes an error.
///
/// # Example
/// ```ignore
/// let entries = parse_header_value(Some("de;q=0.9,fr;q=0.8"));
/// assert_eq!(entries[0].value, "de");
/// ```
pub fn parse_header_value(raw: Option<&str>) -> Vec<HeaderEntry> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }

    let mut entries: Vec<HeaderEntry> = split_unquoted(raw, ',')
        .into_iter()
        .map(parse_entry)
        .collect();

    // Stable by contract: ties keep their input order.
    entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    entries
}

/// Parse one comma-delimited piece into a value token plus its parameters.
fn parse_entry(piece: &str) -> HeaderEntry {
    let mut chunks = split_unquoted(piece, ';').into_iter();
    let value = chunks.next().unwrap_or_default().trim().to_string();

    let mut params: HashMap<String, String> = HashMap::new();
    for chunk in chunks {
        // Exactly one '=': split at the first and reject chunks whose
        // remainder holds another.
        let Some((key, val)) = chunk.split_once('=') else {
            continue;
        };
        if val.contains('=') {
            continue;
        }
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        params.insert(key.to_string(), val.trim().to_string());
    }

    let quality = resolve_quality(params.get("q").map(String::as_str));
    HeaderEntry {
        value,
        params,
        quality,
    }
}

/// Derive the numeric weight for an entry from its raw `q` parameter.
///
/// Input that cannot be read as a number at all (missing, empty, garbage,
/// NaN) counts as full weight 1. Input that parses but falls outside
/// `[0, 1]` clamps to the nearest bound; the infinities parse and clamp like
/// any other out-of-range number.
pub fn resolve_quality(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 1.0;
    };
    if raw.is_empty() {
        return 1.0;
    }
    match raw.parse::<f64>() {
        Ok(parsed) if parsed.is_nan() => 1.0,
        Ok(parsed) => parsed.clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Split `input` on `delimiter`, ignoring delimiters inside quoted spans.
///
/// A quote character (`"` or `'`) opens a span that the next occurrence of
/// the same character closes. An unterminated span runs to the end of the
/// input.
fn split_unquoted(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut open_quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match open_quote {
            Some(quote) if ch == quote => open_quote = None,
            None if ch == '"' || ch == '\'' => open_quote = Some(ch),
            None if ch == delimiter => {
                parts.push(&input[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}
