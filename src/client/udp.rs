//! UDP request sender

use super::{elapsed_ms, RequestSender, TransportError};
use crate::{
    models::{RequestOutcome, TestConfiguration},
    pool::{BufferPool, PoolStats, UdpConnectionPool},
};
use async_trait::async_trait;
use std::{sync::Arc, time::Instant};

/// Sends the body as one datagram and waits for one datagram back
pub struct UdpSender {
    pool: Arc<UdpConnectionPool>,
    buffers: Arc<BufferPool>,
}

impl UdpSender {
    pub fn new(pool: Arc<UdpConnectionPool>, buffers: Arc<BufferPool>) -> Self {
        Self { pool, buffers }
    }

    async fn exchange(
        &self,
        host: &str,
        port: u16,
        body: Option<&[u8]>,
        buffer: &mut [u8],
    ) -> Result<usize, TransportError> {
        let socket = self
            .pool
            .get_or_create(host, port)
            .await
            .map_err(|source| TransportError::Connect {
                destination: format!("{}:{}", host, port),
                source,
            })?;

        if let Some(body) = body {
            socket.send(body).await.map_err(TransportError::Send)?;
        }

        socket.recv(buffer).await.map_err(TransportError::Receive)
    }
}

#[async_trait]
impl RequestSender for UdpSender {
    async fn send(&self, config: &TestConfiguration) -> RequestOutcome {
        let host = config.host();
        let mut buffer = self.buffers.acquire();

        let start = Instant::now();
        let result = tokio::time::timeout(
            config.timeout(),
            self.exchange(&host, config.port, config.body_bytes(), &mut buffer),
        )
        .await;
        let elapsed = elapsed_ms(start);

        self.buffers.release(buffer);

        match result {
            Ok(Ok(received)) => RequestOutcome::success(0, elapsed, received as u64),
            Ok(Err(e)) => RequestOutcome::failed(e.to_string(), elapsed),
            Err(_) => RequestOutcome::timeout(config.timeout(), elapsed),
        }
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(self.pool.stats())
    }

    async fn shutdown(&self) {
        self.pool.close_all().await;
    }
}
