use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, HeaderKind, Result};
use crate::method::Method;

/// `CSeq: 314159 INVITE`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CSeqHeader {
    pub number: u32,
    pub method: Method,
}

impl CSeqHeader {
    pub fn new(number: u32, method: Method) -> Self {
        CSeqHeader { number, method }
    }
}

impl FromStr for CSeqHeader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let err = || Error::parse(HeaderKind::CSeq, s);
        let mut tokens = s.split_whitespace();
        let (Some(number), Some(method), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(err());
        };
        let number = number.parse::<u32>().map_err(|_| err())?;
        let method = method.parse::<Method>().map_err(|_| err())?;
        Ok(CSeqHeader { number, method })
    }
}

impl fmt::Display for CSeqHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.method)
    }
}
