use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use super::{AddressHeader, CSeqHeader, Header, ViaHeader};

/// A typed header value as stored in [`Headers`](crate::headers::Headers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderValue {
    Generic(Header),
    Address(AddressHeader),
    Via(ViaHeader),
    CSeq(CSeqHeader),
    /// `Contact: *`
    Wildcard,
}

impl HeaderValue {
    /// Parses `text` with the grammar registered for the canonical header
    /// name `name`.
    pub fn parse_for(name: &str, text: &str) -> Result<Self> {
        let value = match name {
            "contact" if text.trim() == "*" => HeaderValue::Wildcard,
            "via" => HeaderValue::Via(text.parse()?),
            "cseq" => HeaderValue::CSeq(text.parse()?),
            name if super::name::is_address_header(name) => HeaderValue::Address(text.parse()?),
            _ => HeaderValue::Generic(Header::raw(text)),
        };
        Ok(value)
    }

    pub fn as_generic(&self) -> Option<&Header> {
        match self {
            HeaderValue::Generic(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&AddressHeader> {
        match self {
            HeaderValue::Address(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_address_mut(&mut self) -> Option<&mut AddressHeader> {
        match self {
            HeaderValue::Address(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_via(&self) -> Option<&ViaHeader> {
        match self {
            HeaderValue::Via(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_via_mut(&mut self) -> Option<&mut ViaHeader> {
        match self {
            HeaderValue::Via(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_cseq(&self) -> Option<&CSeqHeader> {
        match self {
            HeaderValue::CSeq(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_cseq_mut(&mut self) -> Option<&mut CSeqHeader> {
        match self {
            HeaderValue::CSeq(h) => Some(h),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, HeaderValue::Wildcard)
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Generic(h) => h.fmt(f),
            HeaderValue::Address(h) => h.fmt(f),
            HeaderValue::Via(h) => h.fmt(f),
            HeaderValue::CSeq(h) => h.fmt(f),
            HeaderValue::Wildcard => f.write_str("*"),
        }
    }
}

impl From<Header> for HeaderValue {
    fn from(h: Header) -> Self {
        HeaderValue::Generic(h)
    }
}

impl From<AddressHeader> for HeaderValue {
    fn from(h: AddressHeader) -> Self {
        HeaderValue::Address(h)
    }
}

impl From<ViaHeader> for HeaderValue {
    fn from(h: ViaHeader) -> Self {
        HeaderValue::Via(h)
    }
}

impl From<CSeqHeader> for HeaderValue {
    fn from(h: CSeqHeader) -> Self {
        HeaderValue::CSeq(h)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Generic(Header::new(value))
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Generic(Header::new(value))
    }
}
