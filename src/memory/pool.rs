//! Zero-filling byte allocator with accounting
//!
//! A `Pool` is handed to every buffer explicitly (usually as `Arc<Pool>`), so
//! each task can own an isolated pool and tests never share counters.

use crate::metrics::{POOL_ALLOCATED_BYTES, POOL_EXTENDED_BYTES, POOL_FREED_BYTES};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Byte allocator for slices
///
/// Every buffer it returns is zero-filled, including the tail added by
/// [`Pool::extend`].
#[derive(Debug, Default)]
pub struct Pool {
    allocated: AtomicU64,
    extended: AtomicU64,
    freed: AtomicU64,
}

impl Pool {
    /// Create a new shared pool
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Allocate `size` zeroed bytes
    pub fn allocate(&self, size: usize) -> Vec<u8> {
        let buf = vec![0u8; size];
        self.allocated.fetch_add(size as u64, Ordering::Relaxed);
        POOL_ALLOCATED_BYTES.inc_by(size as u64);
        buf
    }

    /// Grow `buf` to `new_size` bytes, zero-filling the new tail.
    ///
    /// Existing bytes keep their positions. Failing to reserve memory is
    /// fatal: the process aborts.
    pub fn extend(&self, buf: &mut Vec<u8>, new_size: usize) {
        let old_size = buf.len();
        if new_size <= old_size {
            return;
        }

        let additional = new_size - old_size;
        if let Err(e) = buf.try_reserve_exact(additional) {
            error!(old_size, new_size, error = %e, "Pool extension failed");
            std::process::abort();
        }
        buf.resize(new_size, 0);

        self.extended.fetch_add(additional as u64, Ordering::Relaxed);
        POOL_EXTENDED_BYTES.inc_by(additional as u64);
        debug!(old_size, new_size, "Extended buffer");
    }

    /// Return a buffer to the pool
    pub fn free(&self, buf: Vec<u8>) {
        let size = buf.len();
        self.freed.fetch_add(size as u64, Ordering::Relaxed);
        POOL_FREED_BYTES.inc_by(size as u64);
        drop(buf);
    }

    /// Get statistics about the pool
    pub fn stats(&self) -> PoolStats {
        let allocated = self.allocated.load(Ordering::Relaxed);
        let extended = self.extended.load(Ordering::Relaxed);
        let freed = self.freed.load(Ordering::Relaxed);
        PoolStats {
            allocated,
            extended,
            freed,
            live: (allocated + extended).saturating_sub(freed),
        }
    }
}

/// Statistics for a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Bytes handed out by `allocate`
    pub allocated: u64,
    /// Bytes added by `extend`
    pub extended: u64,
    /// Bytes returned through `free`
    pub freed: u64,
    /// Bytes still held by live buffers
    pub live: u64,
}
