//! Header name registry
//!
//! SIP header names are case-insensitive and several of them have a
//! single-letter compact form (RFC 3261 Section 7.3.3, IANA sip-parameters).
//! Everything in this crate compares header names through [`intern`], which
//! produces the canonical lowercase long form.
//!
//! ```rust
//! use sipua_sip_core::header::name::{compact, intern, normalize};
//!
//! assert_eq!(intern("V"), "via");
//! assert_eq!(normalize("i"), "Call-ID");
//! assert_eq!(compact("Content-Length"), "l");
//! assert_eq!(compact("Max-Forwards"), "Max-Forwards");
//! ```

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Long form / compact form pairs
pub const COMPACT_FORMS: &[(&str, &str)] = &[
    ("accept-contact", "a"),
    ("allow-events", "u"),
    ("call-id", "i"),
    ("contact", "m"),
    ("content-encoding", "e"),
    ("content-length", "l"),
    ("content-type", "c"),
    ("event", "o"),
    ("from", "f"),
    ("identity", "y"),
    ("identify-info", "n"),
    ("refer-to", "r"),
    ("referred-by", "b"),
    ("reject-contact", "j"),
    ("request-disposition", "d"),
    ("session-expires", "x"),
    ("subject", "s"),
    ("supported", "k"),
    ("to", "t"),
    ("via", "v"),
];

/// Headers whose values are comma-separated lists kept in order
pub const MULTI_HEADERS: &[&str] = &[
    "accept",
    "accept-encoding",
    "accept-language",
    "alert-info",
    "allow",
    "call-info",
    "contact",
    "content-encoding",
    "content-language",
    "error-info",
    "in-reply-to",
    "proxy-require",
    "record-route",
    "require",
    "route",
    "supported",
    "unsupported",
    "via",
    "warning",
];

/// Headers carrying a name-addr / addr-spec value
pub const ADDRESS_HEADERS: &[&str] = &["to", "from", "contact", "reply-to", "record-route", "route"];

/// Headers every request must carry
pub const REQUEST_MANDATORY_HEADERS: &[&str] = &["to", "from", "cseq", "call-id", "max-forwards", "via"];

/// Display forms that title-casing gets wrong
const IRREGULAR_FORMS: &[(&str, &str)] = &[
    ("www-authenticate", "WWW-Authenticate"),
    ("cseq", "CSeq"),
    ("call-id", "Call-ID"),
    ("mime-version", "MIME-Version"),
    ("sip-etag", "SIP-ETag"),
];

fn long_form(compact: &str) -> Option<&'static str> {
    COMPACT_FORMS
        .iter()
        .find(|(_, short)| *short == compact)
        .map(|(long, _)| *long)
}

fn compact_form(canonical: &str) -> Option<&'static str> {
    COMPACT_FORMS
        .iter()
        .find(|(long, _)| *long == canonical)
        .map(|(_, short)| *short)
}

/// Canonical lowercase long form of a header name.
pub fn intern(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match long_form(&lower) {
        Some(long) => long.to_string(),
        None => lower,
    }
}

/// Display form of a header name, e.g. `record-route` -> `Record-Route`.
pub fn normalize(name: &str) -> String {
    let canonical = intern(name);
    if let Some((_, display)) = IRREGULAR_FORMS.iter().find(|(n, _)| *n == canonical) {
        return display.to_string();
    }
    canonical
        .split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
}

/// Compact form of a header name, or its display form if it has none.
pub fn compact(name: &str) -> String {
    let canonical = intern(name);
    match compact_form(&canonical) {
        Some(short) => short.to_string(),
        None => normalize(&canonical),
    }
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Whether values of this header are comma-separated lists.
pub fn is_multi_header(name: &str) -> bool {
    MULTI_HEADERS.contains(&intern(name).as_str())
}

/// Whether values of this header are addresses.
pub fn is_address_header(name: &str) -> bool {
    ADDRESS_HEADERS.contains(&intern(name).as_str())
}

/// An interned header name.
///
/// Construction always goes through [`intern`], so two `HeaderName`s are
/// equal exactly when the wire names denote the same header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn new(name: &str) -> Self {
        HeaderName(intern(name))
    }

    /// Canonical lowercase form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        normalize(&self.0)
    }

    pub fn compact(&self) -> String {
        compact(&self.0)
    }

    pub fn is_multi(&self) -> bool {
        MULTI_HEADERS.contains(&self.0.as_str())
    }

    pub fn is_address(&self) -> bool {
        ADDRESS_HEADERS.contains(&self.0.as_str())
    }
}

impl From<&str> for HeaderName {
    fn from(name: &str) -> Self {
        HeaderName::new(name)
    }
}

impl From<&String> for HeaderName {
    fn from(name: &String) -> Self {
        HeaderName::new(name)
    }
}

impl From<&HeaderName> for HeaderName {
    fn from(name: &HeaderName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for HeaderName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}
