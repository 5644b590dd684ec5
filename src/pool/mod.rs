//! Transport resource pools
//!
//! Pools are plain objects created once per run and shared with the senders
//! through `Arc`, then torn down when the run ends.

pub mod buffer;
pub mod connection;
pub mod socket;
pub mod tcp;
pub mod udp;

pub use buffer::BufferPool;
pub use connection::{ConnectionPool, PoolStats, PooledConnection};
pub use socket::SocketOptions;
pub use tcp::{Exchange, TcpConnection};
pub use udp::UdpConnection;

/// Pool of shared TCP streams keyed by destination
pub type TcpConnectionPool = ConnectionPool<TcpConnection>;

/// Pool of connected UDP sockets keyed by destination
pub type UdpConnectionPool = ConnectionPool<UdpConnection>;
