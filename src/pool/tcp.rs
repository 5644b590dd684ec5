//! Shared TCP connection

use super::connection::PooledConnection;
use super::socket::{self, SocketOptions};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};

/// A TCP stream shared by every request to one destination
///
/// Requests take turns: an `Exchange` holds the stream from the first byte
/// written until its reply is read, so a reply is never consumed by another
/// request.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
    alive: AtomicBool,
    turn: Mutex<()>,
}

impl TcpConnection {
    /// Connect with `TCP_NODELAY` and socket timeouts from `options`
    pub async fn connect(host: &str, port: u16, options: &SocketOptions) -> io::Result<Self> {
        let stream = socket::connect_tcp(host, port, options).await?;
        let peer = stream.peer_addr()?;

        Ok(Self {
            stream,
            peer,
            alive: AtomicBool::new(true),
            turn: Mutex::new(()),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Wait for exclusive use of the stream
    ///
    /// Returns `None` if the connection died while waiting; the caller should
    /// fetch a fresh one from the pool.
    pub async fn begin_exchange(&self) -> Option<Exchange<'_>> {
        let turn = self.turn.lock().await;
        if !self.is_alive() {
            return None;
        }
        Some(Exchange {
            connection: self,
            _turn: turn,
            completed: false,
        })
    }

    async fn write_all(&self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            self.stream.writable().await?;
            match self.stream.try_write(data) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            self.stream.readable().await?;
            match self.stream.try_read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Flag the connection so the pool replaces it on next use
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// One request's exclusive turn on a `TcpConnection`
///
/// Dropping an exchange that was not completed (an I/O error, a closed peer
/// or a cancelled future) marks the connection dead, since a reply may still
/// be in flight on the stream.
pub struct Exchange<'a> {
    connection: &'a TcpConnection,
    _turn: MutexGuard<'a, ()>,
    completed: bool,
}

impl Exchange<'_> {
    /// Write all of `data`
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.connection.write_all(data).await
    }

    /// Read whatever is available into `buf`; `Ok(0)` means the peer closed
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.connection.read(buf).await
    }

    /// The reply was consumed; the stream is clean for the next request
    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.connection.mark_dead();
        }
    }
}

#[async_trait]
impl PooledConnection for TcpConnection {
    async fn open(host: &str, port: u16, options: &SocketOptions) -> io::Result<Self> {
        Self::connect(host, port, options).await
    }

    fn is_alive(&self) -> bool {
        if !self.alive.load(Ordering::Acquire) {
            return false;
        }
        match self.stream.take_error() {
            Ok(None) => true,
            _ => {
                self.mark_dead();
                false
            }
        }
    }

    async fn close(&self) {
        self.mark_dead();
    }
}
