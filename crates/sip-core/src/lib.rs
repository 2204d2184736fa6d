//! # sipua-sip-core
//!
//! SIP message model for the sipua stack: header name registry, typed
//! header values, the header collection codec, URIs and messages.
//!
//! ```rust
//! use sipua_sip_core::prelude::*;
//!
//! let message = Message::parse(
//!     b"OPTIONS sip:carol@chicago.com SIP/2.0\r\n\
//!       v: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKhjhs8ass877\r\n\
//!       Max-Forwards: 70\r\n\
//!       t: <sip:carol@chicago.com>\r\n\
//!       f: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
//!       i: a84b4c76e66710\r\n\
//!       CSeq: 63104 OPTIONS\r\n\r\n",
//! )
//! .unwrap();
//!
//! let Message::Request(request) = message else { unreachable!() };
//! assert_eq!(request.method, Method::Options);
//! assert_eq!(request.headers.top_via().and_then(|v| v.branch()), Some("z9hG4bKhjhs8ass877"));
//! assert!(request.validate().is_ok());
//! ```

pub mod error;
pub mod header;
pub mod headers;
pub mod message;
pub mod method;
pub mod token;
pub mod uri;

pub use error::{Error, HeaderKind, Result};
pub use header::{AddressHeader, CSeqHeader, Header, HeaderName, HeaderValue, Params, ViaHeader};
pub use headers::{HeaderEntry, Headers};
pub use message::{Message, Request, Response, reason_phrase};
pub use method::Method;
pub use uri::{Scheme, Uri};

/// Re-exports of the commonly used types
pub mod prelude {
    pub use crate::error::{Error, HeaderKind, Result};
    pub use crate::header::{AddressHeader, CSeqHeader, Header, HeaderName, HeaderValue, Params, ViaHeader};
    pub use crate::headers::{HeaderEntry, Headers};
    pub use crate::message::{Message, Request, Response};
    pub use crate::method::Method;
    pub use crate::token::{generate_call_id, generate_tag};
    pub use crate::uri::{Scheme, Uri};
}
