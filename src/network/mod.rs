//! Connected-UDP transport toward one DHCP server.
//!
//! The socket is bound locally (to a given address or the wildcard) and
//! connected to the server, which pins the default destination and filters
//! stray sources. "Connected" fixes addressing only; no DHCP session is
//! established.

use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Socket, Type};
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};

/// DHCP server ("bootps") port. Relay agents source and sink traffic on
/// this port on both ends of the exchange.
pub const DHCP_SERVER_PORT: u16 = 67;

const WILDCARD_ADDRESS: &str = "0.0.0.0";

/// Defines all possible errors for socket operations.
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Failed to resolve local address '{address}'")]
    ResolveLocal {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve server '{server}'")]
    ResolveServer {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create a new socket")]
    CreateSocket(#[source] io::Error),

    #[error("Failed to set socket to non-blocking mode")]
    SetNonBlocking(#[source] io::Error),

    #[error("Failed to bind socket to {address}")]
    BindSocket {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect socket to {address}")]
    ConnectSocket {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to convert socket to TokioUdpSocket")]
    ConvertToTokio(#[source] io::Error),

    #[error("Failed to read back the bound local address")]
    LocalAddr(#[source] io::Error),

    #[error("No usable address for server '{0}'")]
    NoAddress(String),
}

/// The path to the probed server: one bound, connected, non-blocking UDP
/// socket plus the local address the kernel settled on.
#[derive(Debug)]
pub struct Transport {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl Transport {
    /// Binds and connects the probe socket.
    ///
    /// Local candidates are tried in resolver order and the first that
    /// binds wins; for that socket, server candidates of the same address
    /// family are tried in order and the first that connects wins. A local
    /// resolution failure is immediately fatal. When no combination works,
    /// the server-side failure is reported in preference to a generic
    /// local bind failure.
    pub async fn connect(
        local: Option<&str>,
        local_port: u16,
        server: &str,
        server_port: u16,
    ) -> Result<Self, SocketError> {
        let bind_host = local.unwrap_or(WILDCARD_ADDRESS);
        let locals: Vec<SocketAddr> = lookup_host((bind_host, local_port))
            .await
            .map_err(|source| SocketError::ResolveLocal {
                address: bind_host.to_string(),
                source,
            })?
            .collect();

        let mut bind_error = None;
        let mut server_error = None;

        for local_addr in locals {
            let socket = match bind_nonblocking(local_addr) {
                Ok(socket) => socket,
                Err(err) => {
                    bind_error = Some(err);
                    continue;
                }
            };

            let remotes = match lookup_host((server, server_port)).await {
                Ok(remotes) => remotes,
                Err(source) => {
                    server_error = Some(SocketError::ResolveServer {
                        server: server.to_string(),
                        source,
                    });
                    continue;
                }
            };

            for remote_addr in remotes.filter(|addr| addr.is_ipv4() == local_addr.is_ipv4()) {
                match socket.connect(remote_addr).await {
                    Ok(()) => {
                        let local_addr = socket.local_addr().map_err(SocketError::LocalAddr)?;
                        tracing::debug!(%local_addr, %remote_addr, "transport connected");
                        return Ok(Self { socket, local_addr });
                    }
                    Err(source) => {
                        server_error = Some(SocketError::ConnectSocket {
                            address: remote_addr,
                            source,
                        });
                    }
                }
            }
        }

        Err(server_error
            .or(bind_error)
            .unwrap_or_else(|| SocketError::NoAddress(server.to_string())))
    }

    /// The locally bound address; fills the packet's relay agent field.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends one whole datagram to the connected server.
    pub async fn send(&self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send(packet).await
    }

    /// Receives one whole datagram from the connected server.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }
}

/// Creates a UDP socket for the candidate's address family, switches it to
/// non-blocking before binding, and hands it to the reactor.
fn bind_nonblocking(addr: SocketAddr) -> Result<UdpSocket, SocketError> {
    let socket =
        Socket::new(Domain::for_address(addr), Type::DGRAM, None).map_err(SocketError::CreateSocket)?;

    socket
        .set_nonblocking(true)
        .map_err(SocketError::SetNonBlocking)?;

    socket
        .bind(&addr.into())
        .map_err(|source| SocketError::BindSocket {
            address: addr,
            source,
        })?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(SocketError::ConvertToTokio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn connects_over_loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_port = server.local_addr().unwrap().port();

        let transport = assert_ok!(
            Transport::connect(Some("127.0.0.1"), 0, "127.0.0.1", server_port).await
        );
        assert!(transport.local_addr().ip().is_loopback());
        assert_ne!(transport.local_addr().port(), 0);

        transport.send(b"ping").await.unwrap();
        let mut buf = [0u8; 16];
        let (len, peer) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"ping");
        assert_eq!(peer, transport.local_addr());
    }

    #[tokio::test]
    async fn unresolvable_local_address_is_fatal() {
        let err = Transport::connect(Some("relay.invalid"), 0, "127.0.0.1", DHCP_SERVER_PORT)
            .await
            .unwrap_err();
        assert!(matches!(err, SocketError::ResolveLocal { .. }));
    }

    #[tokio::test]
    async fn unresolvable_server_takes_priority_in_diagnostics() {
        let err = Transport::connect(Some("127.0.0.1"), 0, "server.invalid", DHCP_SERVER_PORT)
            .await
            .unwrap_err();
        assert!(matches!(err, SocketError::ResolveServer { .. }));
    }
}
