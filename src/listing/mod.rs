//! Path listings: turn raw entries into [`Target`]s.
//!
//! Two input shapes are accepted:
//!
//! ```text
//! # textual: one entry per line, optional key=value overrides
//! /etc/resolv.conf,install_path=/var/lib/network/resolv.conf,uid=0,gid=0
//! /etc/httpd/conf.d/*.conf
//! ```
//!
//! ```json
//! [{"path": "/etc/hosts"}, {"path": "/etc/motd", "attrs": {"create": true, "content": "hi"}}]
//! ```
//!
//! The whole input is parsed before anything touches the filesystem, so a
//! malformed entry aborts listing with no side effects. Patterns containing
//! `*` are then expanded; everything else is kept literally, even if the path
//! does not exist yet.

pub mod attrs;

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
pub use attrs::{AttrValue, Attrs};

/// A path to collect, with optional field overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: String,
    pub attrs: Attrs,
}

impl Target {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }
}

/// Structured listing record.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub path: String,
    #[serde(default)]
    pub attrs: Attrs,
}

/// A parsed entry before glob expansion.
struct Entry {
    pattern: String,
    attrs: Attrs,
}

/// Parse textual listing lines.
pub fn parse_lines<I, S>(lines: I) -> Result<Vec<Target>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut entries = Vec::new();
    for (idx, line) in lines.into_iter().enumerate() {
        if let Some(entry) = parse_line(line.as_ref(), idx + 1)? {
            entries.push(entry);
        }
    }
    Ok(expand(entries))
}

/// Parse structured listing records.
pub fn parse_records(records: Vec<Record>) -> Result<Vec<Target>> {
    let mut entries = Vec::new();
    for (idx, record) in records.into_iter().enumerate() {
        let path = record.path.trim();
        if path.starts_with('#') {
            continue;
        }
        if path.is_empty() {
            return Err(Error::listing(
                format!("record {}", idx + 1),
                &record.path,
                "empty path",
            ));
        }
        entries.push(Entry {
            pattern: path.to_string(),
            attrs: record.attrs,
        });
    }
    Ok(expand(entries))
}

/// Parse a JSON array of records.
pub fn parse_json(text: &str) -> Result<Vec<Target>> {
    let records: Vec<Record> = serde_json::from_str(text)
        .map_err(|e| Error::listing("structured listing", "", e.to_string()))?;
    parse_records(records)
}

/// Read a listing file. `.json` files are structured, everything else is
/// textual; `-` reads standard input.
pub fn read_listing(path: &Path) -> Result<Vec<Target>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| Error::io("<stdin>", e))?;
        buf
    } else {
        fs::read_to_string(path).map_err(|e| Error::io(path, e))?
    };

    if path.extension().is_some_and(|ext| ext == "json") {
        parse_json(&text)
    } else {
        parse_lines(text.lines())
    }
}

fn parse_line(line: &str, lineno: usize) -> Result<Option<Entry>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let location = format!("line {}", lineno);
    let parts = attrs::split_unquoted(line)
        .ok_or_else(|| Error::listing(&location, line, "unterminated quote"))?;

    let (path, overrides) = parts
        .split_first()
        .ok_or_else(|| Error::listing(&location, line, "empty entry"))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(Error::listing(&location, line, "empty path"));
    }

    let mut attrs = Attrs::new();
    for segment in overrides {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| Error::listing(&location, line, format!("expected key=value, got '{}'", segment.trim())))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::listing(&location, line, "empty attribute name"));
        }
        attrs.insert(key.to_string(), AttrValue::parse(value));
    }

    if path.contains('*') {
        glob::Pattern::new(path)
            .map_err(|e| Error::listing(&location, line, format!("bad pattern: {}", e)))?;
    }

    Ok(Some(Entry {
        pattern: path.to_string(),
        attrs,
    }))
}

/// Expand patterns and de-duplicate, keeping the first occurrence of a path.
fn expand(entries: Vec<Entry>) -> Vec<Target> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for entry in entries {
        let paths = if entry.pattern.contains('*') {
            expand_pattern(&entry.pattern)
        } else {
            vec![entry.pattern.clone()]
        };

        for path in paths {
            if seen.insert(path.clone()) {
                targets.push(Target {
                    path,
                    attrs: entry.attrs.clone(),
                });
            } else {
                debug!(path = %path, "duplicate listing entry dropped");
            }
        }
    }

    targets
}

fn expand_pattern(pattern: &str) -> Vec<String> {
    let matches = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            // Patterns were validated while parsing.
            warn!(pattern, error = %e, "invalid pattern skipped");
            return Vec::new();
        }
    };

    let mut paths = Vec::new();
    for m in matches {
        match m {
            Ok(p) => match p.to_str() {
                Some(s) => paths.push(s.to_string()),
                None => warn!(path = %p.display(), "non UTF-8 path skipped"),
            },
            Err(e) => warn!(pattern, error = %e, "unreadable match skipped"),
        }
    }

    if paths.is_empty() {
        warn!(pattern, "pattern matched nothing");
    }
    paths
}
