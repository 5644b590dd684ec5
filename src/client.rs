//! Protocol senders and the per-run transport pools they share

pub mod http;
pub mod tcp;
pub mod udp;

#[cfg(test)]
mod integration_tests;

use crate::{
    error::Result,
    models::{RequestOutcome, TestConfiguration},
    pool::{BufferPool, PoolStats, SocketOptions, TcpConnectionPool, UdpConnectionPool},
    types::Protocol,
};
use async_trait::async_trait;
use std::{io, sync::Arc, time::Instant};
use thiserror::Error;

pub use http::HttpSender;
pub use tcp::TcpSender;
pub use udp::UdpSender;

/// Sends one request and classifies the result
///
/// Network failures never surface as errors: every call yields exactly one
/// outcome, timed from just before the network operation.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Issue one request described by `config`
    async fn send(&self, config: &TestConfiguration) -> RequestOutcome;

    /// Counters of the connection pool behind this sender, if it has one
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }

    /// Release transport resources at the end of a run
    async fn shutdown(&self) {}
}

/// Pools created once per run and shared by the socket senders
#[derive(Clone)]
pub struct TransportPools {
    pub buffers: Arc<BufferPool>,
    pub tcp: Arc<TcpConnectionPool>,
    pub udp: Arc<UdpConnectionPool>,
}

impl Default for TransportPools {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportPools {
    pub fn new() -> Self {
        Self::with_options(BufferPool::default(), SocketOptions::default())
    }

    /// Pools whose sockets are bounded by the run's request timeout
    pub fn for_config(config: &TestConfiguration) -> Self {
        Self::with_options(
            BufferPool::default(),
            SocketOptions::with_timeout(config.timeout()),
        )
    }

    pub fn with_options(buffers: BufferPool, options: SocketOptions) -> Self {
        Self {
            buffers: Arc::new(buffers),
            tcp: Arc::new(TcpConnectionPool::with_options(options)),
            udp: Arc::new(UdpConnectionPool::with_options(options)),
        }
    }
}

/// Sender selected by the configured protocol
pub enum ProtocolSender {
    Http(HttpSender),
    Tcp(TcpSender),
    Udp(UdpSender),
}

impl ProtocolSender {
    /// Build the sender for `config.protocol` on top of the given pools
    pub fn for_config(config: &TestConfiguration, pools: &TransportPools) -> Result<Self> {
        Ok(match config.protocol {
            Protocol::Http => ProtocolSender::Http(HttpSender::new(config.timeout())?),
            Protocol::Tcp => ProtocolSender::Tcp(TcpSender::new(
                Arc::clone(&pools.tcp),
                Arc::clone(&pools.buffers),
            )),
            Protocol::Udp => ProtocolSender::Udp(UdpSender::new(
                Arc::clone(&pools.udp),
                Arc::clone(&pools.buffers),
            )),
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolSender::Http(_) => Protocol::Http,
            ProtocolSender::Tcp(_) => Protocol::Tcp,
            ProtocolSender::Udp(_) => Protocol::Udp,
        }
    }
}

#[async_trait]
impl RequestSender for ProtocolSender {
    async fn send(&self, config: &TestConfiguration) -> RequestOutcome {
        match self {
            ProtocolSender::Http(sender) => sender.send(config).await,
            ProtocolSender::Tcp(sender) => sender.send(config).await,
            ProtocolSender::Udp(sender) => sender.send(config).await,
        }
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        match self {
            ProtocolSender::Http(sender) => sender.pool_stats(),
            ProtocolSender::Tcp(sender) => sender.pool_stats(),
            ProtocolSender::Udp(sender) => sender.pool_stats(),
        }
    }

    async fn shutdown(&self) {
        match self {
            ProtocolSender::Http(sender) => sender.shutdown().await,
            ProtocolSender::Tcp(sender) => sender.shutdown().await,
            ProtocolSender::Udp(sender) => sender.shutdown().await,
        }
    }
}

/// Failure of a socket exchange, rendered into the outcome message
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection to {destination} failed: {source}")]
    Connect {
        destination: String,
        #[source]
        source: io::Error,
    },

    #[error("Send failed: {0}")]
    Send(#[source] io::Error),

    #[error("Receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("Connection closed by remote host")]
    Closed,
}

/// Milliseconds elapsed since `start`
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
