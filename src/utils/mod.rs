//! Utility functions and helpers.

pub mod fs;
pub mod http;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Bytes left as-is in relative links: ASCII alphanumerics, `/` and `-_.~`.
///
/// Every other byte is percent-encoded, `(`, `)`, `'` and `,` included, so
/// hrefs match the ones stored in logs written by the old scripts.
const HREF_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Resolve a potentially relative URL against a base URL.
///
/// Absolute URLs are returned unchanged. Relative ones are percent-encoded
/// with [`HREF_ENCODE`] before the join.
pub fn resolve_url(base: &Url, href: &str) -> String {
    let href = href.trim();
    if let Ok(absolute) = Url::parse(href) {
        return absolute.to_string();
    }

    let quoted = utf8_percent_encode(href, HREF_ENCODE).to_string();
    base.join(&quoted)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Capitalize the first letter of every word and lowercase the rest.
///
/// A "word" starts after any non-alphabetic character, so
/// `"FORMULA 1 GRAND PRIX DE MONACO"` becomes `"Formula 1 Grand Prix De Monaco"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.trim().chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
