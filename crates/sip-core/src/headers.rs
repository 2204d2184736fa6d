//! Header collection codec
//!
//! [`Headers`] is an ordered multi-map from canonical header names to typed
//! values. It parses a complete header block (line folding, compact names,
//! comma-separated multi-values) and renders it back, one `Name: value` line
//! per value.
//!
//! ```rust
//! use sipua_sip_core::headers::Headers;
//!
//! let block = "v: SIP/2.0/UDP a.example.com;branch=z9hG4bK1, SIP/2.0/UDP b.example.com;branch=z9hG4bK2\r\n\
//!              i: a84b4c76e66710\r\n\
//!              Max-Forwards: 70";
//! let headers: Headers = block.parse().unwrap();
//! assert_eq!(headers.vias().len(), 2);
//! assert_eq!(headers.call_id(), Some("a84b4c76e66710"));
//! assert_eq!(
//!     headers.to_string(),
//!     "Via: SIP/2.0/UDP a.example.com;branch=z9hG4bK1\r\n\
//!      Via: SIP/2.0/UDP b.example.com;branch=z9hG4bK2\r\n\
//!      Call-ID: a84b4c76e66710\r\n\
//!      Max-Forwards: 70"
//! );
//! ```

use std::fmt;
use std::slice;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, HeaderKind, Result};
use crate::header::{AddressHeader, CSeqHeader, HeaderName, HeaderValue, ViaHeader};

/// The value(s) stored under one header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderEntry {
    Single(HeaderValue),
    Multi(Vec<HeaderValue>),
}

impl HeaderEntry {
    pub fn values(&self) -> &[HeaderValue] {
        match self {
            HeaderEntry::Single(value) => slice::from_ref(value),
            HeaderEntry::Multi(values) => values,
        }
    }

    pub fn values_mut(&mut self) -> &mut [HeaderValue] {
        match self {
            HeaderEntry::Single(value) => slice::from_mut(value),
            HeaderEntry::Multi(values) => values,
        }
    }

    fn into_multi(self) -> Vec<HeaderValue> {
        match self {
            HeaderEntry::Single(value) => vec![value],
            HeaderEntry::Multi(values) => values,
        }
    }
}

/// An ordered, name-normalizing header multi-map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    entries: Vec<(HeaderName, HeaderEntry)>,
    compact: bool,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a header block (no start line, no trailing blank line).
    pub fn parse(block: &str) -> Result<Self> {
        let mut headers = Headers::new();
        for line in unfold(block) {
            let (name, raw) = line
                .split_once(':')
                .ok_or_else(|| Error::parse(HeaderKind::Line, line.as_str()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::parse(HeaderKind::Line, line.as_str()));
            }
            let name = HeaderName::new(name);
            trace!("Parsing header {}: {:?}", name, raw);

            if name.as_str() == "contact" && raw.trim() == "*" {
                headers.insert(name, HeaderValue::Wildcard);
            } else if name.is_multi() {
                for piece in split_list(raw) {
                    let piece = piece.trim();
                    if piece.is_empty() {
                        continue;
                    }
                    let value = HeaderValue::parse_for(name.as_str(), piece)?;
                    headers.append(&name, value);
                }
            } else {
                let value = HeaderValue::parse_for(name.as_str(), raw)?;
                headers.insert(name, value);
            }
        }
        Ok(headers)
    }

    /// Renders names in compact form when set
    pub fn set_compact(&mut self, compact: bool) {
        self.compact = compact;
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    fn position(&self, name: &HeaderName) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn get(&self, name: impl Into<HeaderName>) -> Option<&HeaderEntry> {
        let name = name.into();
        self.position(&name).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: impl Into<HeaderName>) -> Option<&mut HeaderEntry> {
        let name = name.into();
        let i = self.position(&name)?;
        Some(&mut self.entries[i].1)
    }

    /// First value under `name` (the top value of a multi-header)
    pub fn get_first(&self, name: impl Into<HeaderName>) -> Option<&HeaderValue> {
        self.get(name).and_then(|entry| entry.values().first())
    }

    pub fn get_first_mut(&mut self, name: impl Into<HeaderName>) -> Option<&mut HeaderValue> {
        self.get_mut(name).and_then(|entry| entry.values_mut().first_mut())
    }

    /// All values under `name` in order; empty when absent
    pub fn get_all(&self, name: impl Into<HeaderName>) -> &[HeaderValue] {
        self.get(name).map(HeaderEntry::values).unwrap_or(&[])
    }

    pub fn contains(&self, name: impl Into<HeaderName>) -> bool {
        self.position(&name.into()).is_some()
    }

    /// Replaces whatever is stored under `name` with a single value.
    ///
    /// An existing entry keeps its position in the block.
    pub fn insert(&mut self, name: impl Into<HeaderName>, value: impl Into<HeaderValue>) {
        self.replace_entry(name.into(), HeaderEntry::Single(value.into()));
    }

    /// Replaces whatever is stored under `name` with a list of values.
    pub fn insert_all(&mut self, name: impl Into<HeaderName>, values: Vec<HeaderValue>) {
        self.replace_entry(name.into(), HeaderEntry::Multi(values));
    }

    fn replace_entry(&mut self, name: HeaderName, entry: HeaderEntry) {
        match self.position(&name) {
            Some(i) => self.entries[i].1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    fn push_value(&mut self, name: HeaderName, value: HeaderValue, front: bool) {
        let Some(i) = self.position(&name) else {
            self.entries.push((name, HeaderEntry::Multi(vec![value])));
            return;
        };
        let slot = &mut self.entries[i].1;
        let mut values = std::mem::replace(slot, HeaderEntry::Multi(Vec::new())).into_multi();
        if front {
            values.insert(0, value);
        } else {
            values.push(value);
        }
        *slot = HeaderEntry::Multi(values);
    }

    /// Adds a value after the existing ones, turning a single value into a list
    pub fn append(&mut self, name: impl Into<HeaderName>, value: impl Into<HeaderValue>) {
        self.push_value(name.into(), value.into(), false);
    }

    /// Adds a value before the existing ones, turning a single value into a list
    pub fn prepend(&mut self, name: impl Into<HeaderName>, value: impl Into<HeaderValue>) {
        self.push_value(name.into(), value.into(), true);
    }

    pub fn remove(&mut self, name: impl Into<HeaderName>) -> Option<HeaderEntry> {
        let i = self.position(&name.into())?;
        Some(self.entries.remove(i).1)
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderEntry)> {
        self.entries.iter().map(|(n, e)| (n, e))
    }

    pub fn top_via(&self) -> Option<&ViaHeader> {
        self.get_first("via").and_then(HeaderValue::as_via)
    }

    pub fn top_via_mut(&mut self) -> Option<&mut ViaHeader> {
        self.get_first_mut("via").and_then(HeaderValue::as_via_mut)
    }

    pub fn vias(&self) -> Vec<&ViaHeader> {
        self.get_all("via").iter().filter_map(HeaderValue::as_via).collect()
    }

    pub fn cseq(&self) -> Option<&CSeqHeader> {
        self.get_first("cseq").and_then(HeaderValue::as_cseq)
    }

    pub fn cseq_mut(&mut self) -> Option<&mut CSeqHeader> {
        self.get_first_mut("cseq").and_then(HeaderValue::as_cseq_mut)
    }

    pub fn address(&self, name: impl Into<HeaderName>) -> Option<&AddressHeader> {
        self.get_first(name).and_then(HeaderValue::as_address)
    }

    pub fn address_mut(&mut self, name: impl Into<HeaderName>) -> Option<&mut AddressHeader> {
        self.get_first_mut(name).and_then(HeaderValue::as_address_mut)
    }

    /// Value of a generic header
    pub fn text(&self, name: impl Into<HeaderName>) -> Option<&str> {
        self.get_first(name)
            .and_then(HeaderValue::as_generic)
            .map(|h| h.value.as_str())
    }

    pub fn call_id(&self) -> Option<&str> {
        self.text("call-id")
    }

    pub fn max_forwards(&self) -> Option<u32> {
        self.text("max-forwards").and_then(|v| v.trim().parse().ok())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.text("content-length").and_then(|v| v.trim().parse().ok())
    }
}

impl FromStr for Headers {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Headers::parse(s)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, entry) in &self.entries {
            let display = if self.compact { name.compact() } else { name.normalized() };
            for value in entry.values() {
                if !first {
                    f.write_str("\r\n")?;
                }
                first = false;
                write!(f, "{}: {}", display, value)?;
            }
        }
        Ok(())
    }
}

/// Joins continuation lines onto the previous logical line and drops blank
/// lines. Whitespace of a continuation is kept.
fn unfold(block: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let continuation = line.starts_with([' ', '\t']);
        match lines.last_mut() {
            Some(previous) if continuation => previous.push_str(line),
            _ => lines.push(line.to_string()),
        }
    }
    lines
}

/// Splits a multi-header value on commas outside `<...>` and quoted strings.
fn split_list(raw: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                pieces.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&raw[start..]);
    pieces
}
