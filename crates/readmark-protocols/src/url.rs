//! Canonical URL reduction.

use std::sync::LazyLock;

use regex::Regex;

// The pattern is a literal, so the first-use compilation cannot fail.
static URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[A-Za-z0-9:/.\-@%_]*").unwrap());

/// Reduce a raw page URL to its canonical comparable form.
///
/// Keeps the scheme+host+path prefix made of allowed characters and drops
/// everything after the first character outside that set, which is where
/// query strings, fragments, and tracking decoration start. A string with no
/// recognizable URL prefix is returned unchanged so lookups still compare
/// something.
pub fn normalize_url(raw: &str) -> String {
    match URL_PREFIX.find(raw) {
        Some(m) => m.as_str().to_string(),
        None => raw.to_string(),
    }
}
