use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, info, trace, warn};

use sipua_sip_core::Message;

use crate::error::{Error, Result};
use crate::transport::{Interface, Transport, TransportEvent, fill_via};

// Maximum UDP packet size
const MAX_UDP_PACKET_SIZE: usize = 65_507;
// Default channel capacity
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

const TRANSPORT_NAME: &str = "UDP";

/// UDP transport for SIP messages
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: UdpSocket,
    interface: Interface,
    closed: AtomicBool,
    shutdown: Notify,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl UdpTransport {
    /// Creates a new UDP transport bound to the specified address
    pub async fn bind(
        addr: SocketAddr,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        Self::bind_advertising(addr, None, channel_capacity).await
    }

    /// Like [`UdpTransport::bind`], advertising `host` instead of the bound
    /// IP in Vias and local targets.
    pub async fn bind_advertising(
        addr: SocketAddr,
        host: Option<String>,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| Error::BindFailed(addr, e))?;

        let local_addr = socket.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);

        let interface = Interface::new(
            host.unwrap_or_else(|| local_addr.ip().to_string()),
            local_addr.port(),
            TRANSPORT_NAME,
        );

        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let transport = UdpTransport {
            inner: Arc::new(UdpTransportInner {
                socket,
                interface,
                closed: AtomicBool::new(false),
                shutdown: Notify::new(),
                events_tx,
            }),
        };

        transport.spawn_receive_loop();

        Ok((transport, events_rx))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.socket.local_addr().map_err(Error::from)
    }

    // Spawns a task to receive packets from the UDP socket
    fn spawn_receive_loop(&self) {
        let transport = self.clone();
        tokio::spawn(async move {
            let inner = &transport.inner;
            let mut buffer = vec![0u8; MAX_UDP_PACKET_SIZE];

            while !inner.closed.load(Ordering::Acquire) {
                let received = tokio::select! {
                    received = inner.socket.recv_from(&mut buffer) => received,
                    _ = inner.shutdown.notified() => break,
                };

                let (len, src) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        if inner.closed.load(Ordering::Acquire) {
                            break;
                        }
                        error!("Error receiving UDP packet: {}", e);
                        let _ = inner
                            .events_tx
                            .send(TransportEvent::Error {
                                error: format!("Error receiving packet: {}", e),
                            })
                            .await;
                        continue;
                    }
                };

                let packet = Bytes::copy_from_slice(&buffer[..len]);
                if packet.iter().all(u8::is_ascii_whitespace) {
                    trace!("Ignoring keep-alive from {}", src);
                    continue;
                }
                debug!("Received SIP message from {}", src);
                trace!("Received packet from {}: {:?}", src, packet);

                match Message::parse(&packet) {
                    Ok(message) => {
                        let event = TransportEvent::MessageReceived {
                            message,
                            source: src,
                            interface: inner.interface.clone(),
                        };
                        if let Err(e) = inner.events_tx.send(event).await {
                            error!("Error sending event: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Error parsing SIP message from {}: {}", src, e);
                        let _ = inner
                            .events_tx
                            .send(TransportEvent::Error {
                                error: format!("Error parsing SIP message: {}", e),
                            })
                            .await;
                    }
                }
            }

            let _ = inner.events_tx.send(TransportEvent::Closed).await;
            info!("UDP receive loop terminated");
        });
    }

    async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        lookup_host((host, port))
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| Error::ResolveFailed(host.to_string(), port))
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    fn interface(&self) -> Interface {
        self.inner.interface.clone()
    }

    async fn send_message(&self, mut message: Message, host: &str, port: u16) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }

        fill_via(&mut message, &self.inner.interface);
        let bytes = message.to_bytes();
        if bytes.len() > MAX_UDP_PACKET_SIZE {
            return Err(Error::PacketTooLarge(bytes.len(), MAX_UDP_PACKET_SIZE));
        }

        let destination = Self::resolve(host, port).await?;
        debug!("Sending {} byte message to {}", bytes.len(), destination);
        self.inner
            .socket
            .send_to(&bytes, destination)
            .await
            .map_err(|e| Error::SendFailed(destination, e))?;

        trace!("Sent SIP message to {}: {}", destination, message);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.shutdown.notify_one();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(addr) = self.inner.socket.local_addr() {
            write!(f, "UdpTransport({})", addr)
        } else {
            write!(f, "UdpTransport(<error>)")
        }
    }
}
