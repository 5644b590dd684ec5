//! Per-destination connection registry
//!
//! One live connection is cached per `host:port`. The registry is an
//! immutable snapshot behind an `ArcSwap`, so looking up a live entry takes no
//! lock at all. Creating or replacing an entry is serialized per destination
//! so concurrent first requests open a single connection, and publishes a new
//! snapshot.

use super::socket::SocketOptions;
use crate::models::config::destination_key;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A transport handle that can be cached and shared between requests
#[async_trait]
pub trait PooledConnection: Send + Sync + Sized + 'static {
    /// Open a new connection to `host:port`
    async fn open(host: &str, port: u16, options: &SocketOptions) -> io::Result<Self>;

    /// Whether the handle can still carry requests
    fn is_alive(&self) -> bool;

    /// Release the underlying resources
    async fn close(&self) {}
}

/// Counters describing pool activity during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Connections opened, including replacements
    pub opened: u64,
    /// Dead entries replaced with a fresh connection
    pub replaced: u64,
    /// Lookups served by an existing live entry
    pub reused: u64,
    /// Entries currently cached
    pub live: usize,
}

type Registry<C> = HashMap<String, Arc<C>>;

/// Lazily populated cache of one connection per destination
pub struct ConnectionPool<C: PooledConnection> {
    connections: ArcSwap<Registry<C>>,
    creation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    options: SocketOptions,
    opened: AtomicU64,
    replaced: AtomicU64,
    reused: AtomicU64,
}

impl<C: PooledConnection> Default for ConnectionPool<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PooledConnection> ConnectionPool<C> {
    pub fn new() -> Self {
        Self::with_options(SocketOptions::default())
    }

    /// Pool whose new connections are configured with `options`
    pub fn with_options(options: SocketOptions) -> Self {
        Self {
            connections: ArcSwap::from_pointee(HashMap::new()),
            creation_locks: Mutex::new(HashMap::new()),
            options,
            opened: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &SocketOptions {
        &self.options
    }

    /// Return the live connection for `host:port`, opening one if absent or dead
    pub async fn get_or_create(&self, host: &str, port: u16) -> io::Result<Arc<C>> {
        let key = destination_key(host, port);

        if let Some(connection) = self.live_entry(&key) {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return Ok(connection);
        }

        let lock = self.creation_lock(&key).await;
        let _guard = lock.lock().await;

        // Another task may have opened it while we waited
        let stale = match self.connections.load().get(&key) {
            Some(connection) if connection.is_alive() => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(connection));
            }
            Some(_) => true,
            None => false,
        };

        let connection = Arc::new(C::open(host, port, &self.options).await?);
        let previous = self.connections.rcu(|current| {
            let mut next: Registry<C> = (**current).clone();
            next.insert(key.clone(), Arc::clone(&connection));
            next
        });

        if let Some(previous) = previous.get(&key) {
            previous.close().await;
        }

        self.opened.fetch_add(1, Ordering::Relaxed);
        if stale {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }

        Ok(connection)
    }

    /// Currently cached connection for `host:port`, live or not
    pub fn get(&self, host: &str, port: u16) -> Option<Arc<C>> {
        self.connections.load().get(&destination_key(host, port)).cloned()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.connections.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            opened: self.opened.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            live: self.len(),
        }
    }

    /// Close and forget every cached connection
    pub async fn close_all(&self) {
        let drained = self.connections.swap(Arc::new(HashMap::new()));

        for connection in drained.values() {
            connection.close().await;
        }

        self.creation_locks.lock().await.clear();
    }

    fn live_entry(&self, key: &str) -> Option<Arc<C>> {
        self.connections
            .load()
            .get(key)
            .filter(|connection| connection.is_alive())
            .cloned()
    }

    async fn creation_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.creation_locks.lock().await;
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}
