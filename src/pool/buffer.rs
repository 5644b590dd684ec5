//! Reusable fixed-size read buffers
//!
//! TCP and UDP senders read each response into a buffer taken from this pool
//! and hand it back afterwards, so steady-state requests do not allocate.

use crate::defaults;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// A thread-safe pool of equally sized byte buffers
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    max_retained: usize,
    allocations: AtomicU64,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(defaults::DEFAULT_BUFFER_SIZE, defaults::DEFAULT_BUFFER_RETENTION)
    }
}

impl BufferPool {
    /// Create a pool handing out buffers of `buffer_size` bytes and keeping at
    /// most `max_retained` idle ones
    pub fn new(buffer_size: usize, max_retained: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
            max_retained,
            allocations: AtomicU64::new(0),
        }
    }

    /// Take a pooled buffer or allocate a fresh one of the standard size
    pub fn acquire(&self) -> Vec<u8> {
        if let Some(buffer) = self.lock().pop() {
            return buffer;
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        vec![0u8; self.buffer_size]
    }

    /// Return a buffer; anything not of the standard size is dropped
    pub fn release(&self, buffer: Vec<u8>) {
        if buffer.len() != self.buffer_size {
            return;
        }

        let mut buffers = self.lock();
        if buffers.len() < self.max_retained {
            buffers.push(buffer);
        }
    }

    /// Fill the pool with up to `count` idle buffers before a run
    pub fn preallocate(&self, count: usize) {
        let mut buffers = self.lock();
        let target = count.min(self.max_retained);
        while buffers.len() < target {
            buffers.push(vec![0u8; self.buffer_size]);
        }
    }

    /// Number of idle buffers
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    /// Number of buffers allocated by `acquire` because the pool was empty
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Standard buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Drop every idle buffer
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A poisoned lock only means another holder panicked; the Vec is still valid.
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
