use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, HeaderKind, Result};
use crate::uri::Uri;
use super::params::{Params, split_params};

/// An address header value (To, From, Contact, Route, Record-Route, Reply-To).
///
/// Two wire forms are accepted:
///
/// - name-addr: `"Alice" <sip:alice@example.com>;tag=1928301774`
/// - addr-spec: `sip:alice@example.com;tag=1928301774`
///
/// In the addr-spec form everything after the first `;` belongs to the
/// header, not the URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressHeader {
    /// Display name as written, quotes included
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: Params,
}

impl AddressHeader {
    pub fn new(uri: Uri) -> Self {
        AddressHeader {
            display_name: None,
            uri,
            params: Params::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_tag(tag);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn tag(&self) -> Option<&str> {
        self.params.get("tag")
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.set("tag", Some(tag.into()));
    }

    fn parse_uri(text: &str, original: &str) -> Result<Uri> {
        text.parse()
            .map_err(|_| Error::parse(HeaderKind::Address, original))
    }
}

impl FromStr for AddressHeader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(Error::parse(HeaderKind::Address, s));
        }

        let Some(open) = text.find('<') else {
            let (uri, params) = split_params(text);
            return Ok(AddressHeader {
                display_name: None,
                uri: Self::parse_uri(uri, s)?,
                params,
            });
        };

        let close = text[open..]
            .find('>')
            .map(|i| open + i)
            .ok_or_else(|| Error::parse(HeaderKind::Address, s))?;
        let display = text[..open].trim();
        let uri = Self::parse_uri(&text[open + 1..close], s)?;

        let after = text[close + 1..].trim_start();
        let params = if after.is_empty() {
            Params::new()
        } else if let Some(block) = after.strip_prefix(';') {
            Params::parse(block)
        } else {
            return Err(Error::parse(HeaderKind::Address, s));
        };

        Ok(AddressHeader {
            display_name: (!display.is_empty()).then(|| display.to_string()),
            uri,
            params,
        })
    }
}

impl fmt::Display for AddressHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => write!(f, "{} <{}>", name, self.uri)?,
            Some(_) => write!(f, "<{}>", self.uri)?,
            None if self.uri.needs_angle_brackets() => write!(f, "<{}>", self.uri)?,
            None => write!(f, "{}", self.uri)?,
        }
        if !self.params.is_empty() {
            write!(f, ";{}", self.params)?;
        }
        Ok(())
    }
}
