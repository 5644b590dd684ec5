//! TCP request sender

use super::{elapsed_ms, RequestSender, TransportError};
use crate::{
    models::{RequestOutcome, TestConfiguration},
    pool::{BufferPool, PoolStats, TcpConnectionPool},
};
use async_trait::async_trait;
use std::{sync::Arc, time::Instant};

/// Writes the body to a pooled stream and reads one buffer of response
///
/// Requests to the same destination share one stream and take turns on it.
pub struct TcpSender {
    pool: Arc<TcpConnectionPool>,
    buffers: Arc<BufferPool>,
}

impl TcpSender {
    pub fn new(pool: Arc<TcpConnectionPool>, buffers: Arc<BufferPool>) -> Self {
        Self { pool, buffers }
    }

    async fn exchange(
        &self,
        host: &str,
        port: u16,
        body: Option<&[u8]>,
        buffer: &mut [u8],
    ) -> Result<usize, TransportError> {
        loop {
            let connection = self
                .pool
                .get_or_create(host, port)
                .await
                .map_err(|source| TransportError::Connect {
                    destination: format!("{}:{}", host, port),
                    source,
                })?;

            // Died while queued behind another request; the pool replaces it
            let Some(mut exchange) = connection.begin_exchange().await else {
                continue;
            };

            if let Some(body) = body {
                exchange.write_all(body).await.map_err(TransportError::Send)?;
            }

            return match exchange.read(buffer).await {
                Ok(0) => Err(TransportError::Closed),
                Ok(n) => {
                    exchange.complete();
                    Ok(n)
                }
                Err(e) => Err(TransportError::Receive(e)),
            };
        }
    }
}

#[async_trait]
impl RequestSender for TcpSender {
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
            Ok(Ok(read)) => RequestOutcome::success(0, elapsed, read as u64),
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
