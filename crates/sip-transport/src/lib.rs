//! SIP transport layer for the sipua stack
//!
//! Transports deliver complete decoded messages as [`TransportEvent`]s over
//! an `mpsc` channel and send messages to a host and port. Only UDP is
//! provided; stream framing is out of scope.

pub mod error;
pub mod transport;
pub mod udp;

pub use error::{Error, Result};
pub use transport::{Interface, Transport, TransportEvent, fill_via};
pub use udp::UdpTransport;

/// Bind a UDP transport to the specified address
pub async fn bind_udp(addr: std::net::SocketAddr) -> Result<(UdpTransport, tokio::sync::mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr, None).await
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{Error, Interface, Result, Transport, TransportEvent, UdpTransport, bind_udp};
}
