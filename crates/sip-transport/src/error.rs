use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in SIP transport
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to bind to the requested address
    #[error("Failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, #[source] io::Error),

    /// Failed to send a datagram
    #[error("Failed to send to {0}: {1}")]
    SendFailed(SocketAddr, #[source] io::Error),

    /// The destination host could not be resolved
    #[error("Failed to resolve {0}:{1}")]
    ResolveFailed(String, u16),

    /// Encoded message exceeds the datagram limit
    #[error("Packet too large: {0} bytes (max {1})")]
    PacketTooLarge(usize, usize),

    /// The transport has been closed
    #[error("Transport is closed")]
    TransportClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
