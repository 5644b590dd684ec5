//! Shared connected UDP socket

use super::connection::PooledConnection;
use super::socket::{self, SocketOptions};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// A UDP socket bound to an ephemeral port and connected to one destination
#[derive(Debug)]
pub struct UdpConnection {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpConnection {
    /// Resolve `host:port`, bind an ephemeral port of the same family and connect
    pub async fn connect(host: &str, port: u16, options: &SocketOptions) -> io::Result<Self> {
        let peer = socket::resolve(host, port).await?[0];
        let socket = socket::bind_udp(peer, options)?;
        socket.connect(peer).await?;

        Ok(Self { socket, peer })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Whether outgoing datagrams are sent with fragmentation forbidden
    pub fn dont_fragment(&self) -> io::Result<bool> {
        socket::dont_fragment(&socket2::SockRef::from(&self.socket), self.peer)
    }

    /// Send one datagram
    pub async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data).await
    }

    /// Receive one datagram into `buf`
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }
}

#[async_trait]
impl PooledConnection for UdpConnection {
    async fn open(host: &str, port: u16, options: &SocketOptions) -> io::Result<Self> {
        Self::connect(host, port, options).await
    }

    // Connectionless; a connected socket stays usable for the whole run.
    fn is_alive(&self) -> bool {
        true
    }
}
