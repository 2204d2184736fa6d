//! Header names and typed header values
//!
//! Each typed header implements [`FromStr`](std::str::FromStr) for parsing
//! and [`Display`](std::fmt::Display) for rendering. Parsing is pure and
//! either yields a complete value or an [`Error::Parse`](crate::Error::Parse).

pub mod address;
pub mod cseq;
pub mod generic;
pub mod name;
pub mod params;
pub mod value;
pub mod via;

pub use address::AddressHeader;
pub use cseq::CSeqHeader;
pub use generic::Header;
pub use name::HeaderName;
pub use params::Params;
pub use value::HeaderValue;
pub use via::ViaHeader;
