//! Socket construction for pooled connections
//!
//! Every socket is built through `socket2` so its options are set before
//! tokio takes ownership: `TCP_NODELAY` for TCP, path-MTU "do" (no local
//! fragmentation) for UDP, and `SO_RCVTIMEO`/`SO_SNDTIMEO` on both.

use crate::defaults;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream, UdpSocket};

/// Options applied to every socket a pool opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Upper bound on establishing a TCP connection
    pub connect_timeout: Duration,
    /// Socket-level send and receive timeout
    pub io_timeout: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self::with_timeout(defaults::DEFAULT_TIMEOUT)
    }
}

impl SocketOptions {
    /// Use `timeout` for connecting and for socket I/O
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            io_timeout: timeout,
        }
    }

    fn apply_timeouts(&self, socket: &Socket) -> io::Result<()> {
        // A zero duration means "no timeout" to the OS and is rejected by socket2
        let timeout = Some(self.io_timeout).filter(|t| !t.is_zero());
        socket.set_read_timeout(timeout)?;
        socket.set_write_timeout(timeout)
    }
}

/// Resolve `host:port` to every candidate address
pub async fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("No address found for {}:{}", host, port),
        ));
    }
    Ok(addrs)
}

/// Connect to the first reachable address of `host:port`
pub async fn connect_tcp(host: &str, port: u16, options: &SocketOptions) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in resolve(host, port).await? {
        match connect_tcp_addr(addr, options).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable)))
}

async fn connect_tcp_addr(addr: SocketAddr, options: &SocketOptions) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nodelay(true)?;
    options.apply_timeouts(&socket)?;
    socket.set_nonblocking(true)?;

    let socket = TcpSocket::from_std_stream(socket.into());
    match tokio::time::timeout(options.connect_timeout, socket.connect(addr)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!(
                "Connecting to {} timed out after {}ms",
                addr,
                options.connect_timeout.as_millis()
            ),
        )),
    }
}

/// Bind an ephemeral UDP socket of `peer`'s address family
pub fn bind_udp(peer: SocketAddr, options: &SocketOptions) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(peer), Type::DGRAM, Some(Protocol::UDP))?;
    set_dont_fragment(&socket, peer)?;
    options.apply_timeouts(&socket)?;

    let local: SocketAddr = if peer.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    socket.bind(&local.into())?;
    socket.set_nonblocking(true)?;

    UdpSocket::from_std(socket.into())
}

#[cfg(target_os = "linux")]
fn mtu_discover_option(peer: SocketAddr) -> (libc::c_int, libc::c_int, libc::c_int) {
    if peer.is_ipv4() {
        (libc::IPPROTO_IP, libc::IP_MTU_DISCOVER, libc::IP_PMTUDISC_DO)
    } else {
        (libc::IPPROTO_IPV6, libc::IPV6_MTU_DISCOVER, libc::IPV6_PMTUDISC_DO)
    }
}

/// Forbid fragmentation of outgoing datagrams (sets the DF bit on IPv4)
#[cfg(target_os = "linux")]
pub fn set_dont_fragment(socket: &Socket, peer: SocketAddr) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let (level, name, value) = mtu_discover_option(peer);
    // SAFETY: `value` lives across the call and the length matches its type
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Whether fragmentation of outgoing datagrams is forbidden
#[cfg(target_os = "linux")]
pub fn dont_fragment(socket: &Socket, peer: SocketAddr) -> io::Result<bool> {
    use std::os::fd::AsRawFd;

    let (level, name, expected) = mtu_discover_option(peer);
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: `value` and `len` describe a writable c_int for the whole call
    let rc = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if rc == 0 {
        Ok(value == expected)
    } else {
        Err(io::Error::last_os_error())
    }
}

// No portable don't-fragment option elsewhere; datagrams keep the OS default.
#[cfg(not(target_os = "linux"))]
pub fn set_dont_fragment(_socket: &Socket, _peer: SocketAddr) -> io::Result<()> {
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn dont_fragment(_socket: &Socket, _peer: SocketAddr) -> io::Result<bool> {
    Ok(false)
}
