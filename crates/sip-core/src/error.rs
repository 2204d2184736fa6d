use std::fmt;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// The grammar a parse failure was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Plain `value;params` header
    Generic,
    /// name-addr / addr-spec header (To, From, Contact, Route, ...)
    Address,
    /// Via header
    Via,
    /// CSeq header
    CSeq,
    /// A raw `Name: value` line of a header block
    Line,
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeaderKind::Generic => "generic",
            HeaderKind::Address => "address",
            HeaderKind::Via => "Via",
            HeaderKind::CSeq => "CSeq",
            HeaderKind::Line => "header line",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in SIP protocol handling
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed header text. Never accompanied by a partially built value.
    #[error("Malformed {kind} header: {text:?}")]
    Parse {
        /// Which header grammar rejected the input
        kind: HeaderKind,
        /// The offending raw text
        text: String,
    },

    /// Invalid SIP URI
    #[error("Invalid SIP URI: {0:?}")]
    InvalidUri(String),

    /// Invalid start line or message framing
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// A request is missing one of the headers RFC 3261 requires
    #[error("Missing mandatory header: {0}")]
    MissingHeader(String),
}

impl Error {
    /// Shorthand for a [`Error::Parse`] value.
    pub fn parse(kind: HeaderKind, text: impl Into<String>) -> Self {
        Error::Parse {
            kind,
            text: text.into(),
        }
    }

    /// Whether this is a validation failure rather than a syntax failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingHeader(_))
    }
}
