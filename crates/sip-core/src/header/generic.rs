use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::params::{Params, split_params};

/// A header without a dedicated grammar: a value and optional parameters.
///
/// ```rust
/// use sipua_sip_core::header::Header;
///
/// let h: Header = "application/sdp;charset=utf-8".parse().unwrap();
/// assert_eq!(h.value, "application/sdp");
/// assert_eq!(h.param("charset"), Some("utf-8"));
/// assert_eq!(h.to_string(), "application/sdp;charset=utf-8");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub value: String,
    pub params: Params,
}

impl Header {
    pub fn new(value: impl Into<String>) -> Self {
        Header {
            value: value.into(),
            params: Params::new(),
        }
    }

    /// Keeps `text` (trimmed) as the value without splitting parameters.
    ///
    /// This is how the header codec stores headers it has no grammar for,
    /// so values such as `Digest realm="a;b"` survive untouched.
    pub fn raw(text: &str) -> Self {
        Header::new(text.trim())
    }

    pub fn with_param(mut self, name: &str, value: Option<&str>) -> Self {
        self.params.set(name, value.map(str::to_string));
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

impl FromStr for Header {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (value, params) = split_params(s.trim());
        Ok(Header {
            value: value.trim().to_string(),
            params,
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        if !self.params.is_empty() {
            write!(f, ";{}", self.params)?;
        }
        Ok(())
    }
}

impl From<&str> for Header {
    fn from(value: &str) -> Self {
        Header::new(value)
    }
}

impl From<String> for Header {
    fn from(value: String) -> Self {
        Header::new(value)
    }
}
