use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, HeaderKind, Result};
use super::params::{Params, split_params};

pub const DEFAULT_VERSION: &str = "SIP/2.0";

/// A single Via value: `SIP/2.0/UDP host.example.com:5060;branch=z9hG4bK776`.
///
/// A Via without transport and host is *unfilled*: the UA puts one on every
/// outgoing request and the transport completes it from its listening
/// interface before sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaHeader {
    pub version: String,
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub params: Params,
}

impl Default for ViaHeader {
    fn default() -> Self {
        ViaHeader {
            version: DEFAULT_VERSION.to_string(),
            transport: None,
            host: None,
            port: None,
            params: Params::new(),
        }
    }
}

impl ViaHeader {
    pub fn new(transport: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        ViaHeader {
            transport: Some(transport.into()),
            host: Some(host.into()),
            port,
            ..Default::default()
        }
    }

    pub fn is_filled(&self) -> bool {
        self.transport.is_some() && self.host.is_some()
    }

    pub fn fill(&mut self, transport: impl Into<String>, host: impl Into<String>, port: u16) {
        self.transport = Some(transport.into());
        self.host = Some(host.into());
        self.port = Some(port);
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.get("branch")
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.params.set("branch", Some(branch.into()));
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.set_branch(branch);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Host and port the response for this hop is sent to
    pub fn sent_by(&self) -> Option<(&str, Option<u16>)> {
        self.host.as_deref().map(|host| (host, self.port))
    }
}

fn split_host_port(text: &str) -> Option<(&str, Option<u16>)> {
    let (host, port) = if text.starts_with('[') {
        let close = text.find(']')?;
        let rest = &text[close + 1..];
        let port = match rest.strip_prefix(':') {
            Some(port) => Some(port),
            None if rest.is_empty() => None,
            None => return None,
        };
        (&text[..=close], port)
    } else {
        match text.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (text, None),
        }
    };
    if host.is_empty() || host.contains(char::is_whitespace) {
        return None;
    }
    let port = match port {
        Some(port) => Some(port.trim().parse::<u16>().ok()?),
        None => None,
    };
    Some((host, port))
}

impl FromStr for ViaHeader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let err = || Error::parse(HeaderKind::Via, s);
        let text = s.trim();
        let (protocol, rest) = text.split_once(char::is_whitespace).ok_or_else(err)?;
        let (version, transport) = protocol.rsplit_once('/').ok_or_else(err)?;
        if !version.contains('/') || transport.is_empty() {
            return Err(err());
        }

        let (sent_by, params) = split_params(rest.trim());
        let (host, port) = split_host_port(sent_by.trim()).ok_or_else(err)?;

        Ok(ViaHeader {
            version: version.to_string(),
            transport: Some(transport.to_string()),
            host: Some(host.to_string()),
            port,
            params,
        })
    }
}

impl fmt::Display for ViaHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.version, self.transport.as_deref().unwrap_or_default())?;
        if let Some(host) = &self.host {
            write!(f, " {}", host)?;
            if let Some(port) = self.port {
                write!(f, ":{}", port)?;
            }
        }
        if !self.params.is_empty() {
            write!(f, ";{}", self.params)?;
        }
        Ok(())
    }
}
