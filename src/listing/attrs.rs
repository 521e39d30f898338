//! Attribute overrides attached to listing entries.
//!
//! Textual grammar for a value:
//! - `true` / `false` (any case) is a boolean
//! - a run of ASCII digits is an integer
//! - `"..."` or `'...'` is a string literal, quotes removed
//! - anything else is kept as a raw string

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field overrides keyed by attribute name.
pub type Attrs = BTreeMap<String, AttrValue>;

/// One override value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl AttrValue {
    /// Parse a raw textual value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Self::Int(n);
            }
        }
        if let Some(inner) = unquote(raw) {
            return Self::Str(inner.to_string());
        }
        Self::Str(raw.to_string())
    }

    /// Truthiness: booleans as-is, non-zero integers, and non-empty strings
    /// other than `false`/`0`.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Str(s) => !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0"),
        }
    }

    /// Non-negative integer that fits a uid/gid.
    pub fn as_id(&self) -> Option<u32> {
        match self {
            Self::Int(n) => u32::try_from(*n).ok(),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Permission bits. The decimal digits as written are read as octal,
    /// so both `644` and `"0644"` mean `0o644`.
    pub fn as_mode(&self) -> Option<u32> {
        let digits = match self {
            Self::Int(n) if *n >= 0 => n.to_string(),
            Self::Str(s) => s.trim().to_string(),
            _ => return None,
        };
        u32::from_str_radix(&digits, 8).ok().filter(|m| *m <= 0o7777)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => f.write_str(s),
        }
    }
}

fn unquote(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return Some(&raw[1..raw.len() - 1]);
        }
    }
    None
}

/// Split a textual entry on commas that are not inside quotes.
///
/// A quote only opens as the first character of a value, so paths and bare values may contain
/// `'` and `"` freely. Returns `None` if a quote is left open.
pub(crate) fn split_unquoted(entry: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut start = 0;

    for (i, c) in entry.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') if prev == Some('=') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ',') => {
                parts.push(&entry[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }

    if quote.is_some() {
        return None;
    }
    parts.push(&entry[start..]);
    Some(parts)
}
