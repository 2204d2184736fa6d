//! SIP URIs
//!
//! `sip:` and `sips:` URIs are parsed into their components:
//!
//! ```text
//! sip:user:password@host:port;uri-parameters?headers
//! ```
//!
//! Any other scheme (`tel:`, `urn:`, ...) is kept as an opaque string so it
//! can be carried through address headers untouched.
//!
//! ```rust
//! use sipua_sip_core::uri::{Scheme, Uri};
//!
//! let uri: Uri = "sip:alice@example.com:5070;transport=udp".parse().unwrap();
//! assert_eq!(uri.scheme, Scheme::Sip);
//! assert_eq!(uri.user.as_deref(), Some("alice"));
//! assert_eq!(uri.host, "example.com");
//! assert_eq!(uri.port, Some(5070));
//! assert_eq!(uri.transport(), Some("udp"));
//!
//! let uri = Uri::sip("example.com").with_user("bob").with_port(5060);
//! assert_eq!(uri.to_string(), "sip:bob@example.com:5060");
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::header::params::Params;

/// URI scheme
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Sip,
    Sips,
    Tel,
    Other(String),
}

impl Scheme {
    pub fn as_str(&self) -> &str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Tel => "tel",
            Scheme::Other(scheme) => scheme,
        }
    }

    /// Whether URIs of this scheme have SIP structure (user, host, port...)
    pub fn is_sip(&self) -> bool {
        matches!(self, Scheme::Sip | Scheme::Sips)
    }

    fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "sip" => Scheme::Sip,
            "sips" => Scheme::Sips,
            "tel" => Scheme::Tel,
            _ => Scheme::Other(token.to_string()),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SIP URI.
///
/// For non-SIP schemes only `scheme` and `opaque` are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Domain name, IPv4 address or bracketed IPv6 reference
    pub host: String,
    pub port: Option<u16>,
    pub params: Params,
    pub headers: Vec<(String, String)>,
    /// Everything after `scheme:` for non-SIP schemes
    pub opaque: Option<String>,
}

impl Uri {
    /// Creates a `sip:` URI for the given host
    pub fn sip(host: impl Into<String>) -> Self {
        Uri {
            scheme: Scheme::Sip,
            user: None,
            password: None,
            host: host.into(),
            port: None,
            params: Params::new(),
            headers: Vec::new(),
            opaque: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_param(mut self, name: &str, value: Option<&str>) -> Self {
        self.params.set(name, value.map(str::to_string));
        self
    }

    pub fn transport(&self) -> Option<&str> {
        self.params.get("transport")
    }

    /// Host without IPv6 brackets, suitable for address resolution
    pub fn host_for_resolution(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// Whether rendering needs the name-addr form (`<uri>`) inside an
    /// address header, so its `;` and `?` are not read as header params.
    pub fn needs_angle_brackets(&self) -> bool {
        !self.params.is_empty() || !self.headers.is_empty()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(opaque) = &self.opaque {
            return f.write_str(opaque);
        }
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if let Some(password) = &self.password {
                write!(f, ":{}", password)?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if !self.params.is_empty() {
            write!(f, ";{}", self.params)?;
        }
        for (i, (name, value)) in self.headers.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (rest, scheme) = scheme(s).map_err(|_| Error::InvalidUri(s.to_string()))?;
        let scheme = Scheme::from_token(scheme);

        if !scheme.is_sip() {
            if rest.is_empty() {
                return Err(Error::InvalidUri(s.to_string()));
            }
            return Ok(Uri {
                scheme,
                user: None,
                password: None,
                host: String::new(),
                port: None,
                params: Params::new(),
                headers: Vec::new(),
                opaque: Some(rest.to_string()),
            });
        }

        let (_, parts) = all_consuming(sip_uri_body)(rest).map_err(|_| Error::InvalidUri(s.to_string()))?;
        let (userinfo, host, port, params, headers) = parts;
        let (user, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, password)) => (Some(user.to_string()), Some(password.to_string())),
                None => (Some(info.to_string()), None),
            },
            None => (None, None),
        };

        Ok(Uri {
            scheme,
            user,
            password,
            host: host.to_string(),
            port,
            params: params.into_iter().collect(),
            headers: headers
                .into_iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            opaque: None,
        })
    }
}

type UriParts<'a> = (
    Option<&'a str>,
    &'a str,
    Option<u16>,
    Vec<(&'a str, Option<&'a str>)>,
    Vec<(&'a str, &'a str)>,
);

fn scheme(input: &str) -> IResult<&str, &str> {
    terminated(
        take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        char(':'),
    )(input)
}

fn userinfo(input: &str) -> IResult<&str, &str> {
    terminated(
        take_while1(|c: char| !matches!(c, '@' | ';' | '?' | '<' | '>') && !c.is_whitespace()),
        char('@'),
    )(input)
}

fn host(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(
            char('['),
            take_while1(|c: char| c.is_ascii_hexdigit() || c == ':' || c == '.'),
            char(']'),
        )),
        take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')),
    ))(input)
}

fn port(input: &str) -> IResult<&str, u16> {
    preceded(char(':'), map_res(digit1, str::parse::<u16>))(input)
}

fn is_param_char(c: char) -> bool {
    !matches!(c, ';' | '?' | '=' | '&' | '<' | '>') && !c.is_whitespace()
}

fn uri_param(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    preceded(
        char(';'),
        pair(take_while1(is_param_char), opt(preceded(char('='), take_while(is_param_char)))),
    )(input)
}

fn uri_headers(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    preceded(
        tag("?"),
        separated_list1(
            char('&'),
            separated_pair(take_while1(is_param_char), char('='), take_while(is_param_char)),
        ),
    )(input)
}

fn sip_uri_body(input: &str) -> IResult<&str, UriParts<'_>> {
    let (input, userinfo) = opt(userinfo)(input)?;
    let (input, host) = host(input)?;
    let (input, port) = opt(port)(input)?;
    let (input, params) = many0(uri_param)(input)?;
    let (input, headers) = opt(uri_headers)(input)?;
    Ok((input, (userinfo, host, port, params, headers.unwrap_or_default())))
}
