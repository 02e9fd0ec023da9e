//! Trait abstraction for datagram transmission to enable testing

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::info;

/// Trait for sending datagrams to the moving-map client
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram to the configured target
    async fn send(&self, data: &[u8]) -> io::Result<()>;
}

/// UDP broadcast socket that implements DatagramTransport
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Bind a broadcast-enabled socket on `bind_addr` sending to `target`
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be bound or broadcast cannot be enabled
    pub async fn bind(bind_addr: SocketAddr, target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;

        info!(
            local_addr = ?socket.local_addr().ok(),
            target = %target,
            "UDP broadcast socket ready"
        );

        Ok(Self { socket, target })
    }

    /// Datagram destination
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send(&self, data: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(data, self.target).await?;
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram: {} of {} bytes", sent, data.len()),
            ));
        }
        Ok(())
    }
}
