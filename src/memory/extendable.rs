//! Growable byte arena addressed by logical position
//!
//! A value written at position `p` stays at `p` for the life of the slice;
//! growth only moves the backing allocation. Callers keep positions, never
//! references, across writes.
//!
//! # Growth
//!
//! ```text
//! extensions  0..8   → ×2.0
//! extensions  8..16  → ×1.5
//! extensions 16..    → ×1.2
//! ```
//!
//! A single write that needs `soft_growth_limit` successive extensions logs
//! a warning; reaching `hard_growth_limit` aborts the process.

use super::pool::Pool;
use super::scalar::Scalar;
use super::slice::{hash_bytes, Slice};
use crate::config::SliceConfig;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Capacity-growth schedule
#[derive(Debug, Clone, Copy)]
pub struct GrowthPolicy;

impl GrowthPolicy {
    /// Smallest non-zero capacity
    pub const MIN_CAPACITY: usize = 64;

    /// Growth factor after `extensions` lifetime extensions
    #[inline]
    pub fn factor(extensions: u32) -> f64 {
        match extensions {
            0..=7 => 2.0,
            8..=15 => 1.5,
            _ => 1.2,
        }
    }

    /// Next capacity after one extension from `capacity`
    #[inline]
    pub fn next_capacity(capacity: usize, extensions: u32) -> usize {
        if capacity == 0 {
            return Self::MIN_CAPACITY;
        }
        let grown = (capacity as f64 * Self::factor(extensions)).ceil() as usize;
        grown.max(capacity + 1)
    }
}

/// Owning slice that grows on demand
#[derive(Debug)]
pub struct ExtendableSlice {
    pool: Arc<Pool>,
    buf: Vec<u8>,
    extensions: u32,
    limits: SliceConfig,
}

impl ExtendableSlice {
    /// Create an empty slice with default limits
    pub fn new(pool: &Arc<Pool>) -> Self {
        Self::with_config(pool, &SliceConfig::default())
    }

    /// Create a slice using the given capacity and growth limits
    pub fn with_config(pool: &Arc<Pool>, config: &SliceConfig) -> Self {
        Self {
            pool: Arc::clone(pool),
            buf: pool.allocate(config.initial_capacity),
            extensions: 0,
            limits: config.clone(),
        }
    }

    /// Allocated capacity in bytes
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Lifetime number of extensions
    pub fn extensions(&self) -> u32 {
        self.extensions
    }

    /// Make positions `[0, end)` addressable
    pub fn ensure(&mut self, end: usize) {
        let old_capacity = self.buf.len();
        if end <= old_capacity {
            return;
        }

        let mut capacity = old_capacity;
        let mut steps = 0u32;
        while capacity < end {
            capacity = GrowthPolicy::next_capacity(capacity, self.extensions);
            self.extensions += 1;
            steps += 1;

            if steps == self.limits.soft_growth_limit {
                warn!(
                    steps,
                    requested = end,
                    capacity,
                    "Slice growth escalating within a single write"
                );
            }
            if steps >= self.limits.hard_growth_limit {
                error!(
                    steps,
                    requested = end,
                    capacity,
                    "Runaway slice growth, aborting"
                );
                std::process::abort();
            }
        }

        self.pool.extend(&mut self.buf, capacity);
        debug!(
            old_capacity,
            capacity,
            extensions = self.extensions,
            "Grew extendable slice"
        );
    }

    /// Typed write at `pos`; returns bytes written
    pub fn write<T: Scalar>(&mut self, pos: usize, value: T) -> usize {
        self.ensure(pos + T::WIDTH);
        value.encode(&mut self.buf[pos..pos + T::WIDTH]);
        T::WIDTH
    }

    /// Copy `bytes` to `pos`; returns bytes written
    pub fn write_bytes(&mut self, pos: usize, bytes: &[u8]) -> usize {
        self.ensure(pos + bytes.len());
        self.buf[pos..pos + bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }

    /// Hash of the encoded scalar at `pos`
    #[inline]
    pub fn hash_scalar<T: Scalar>(&self, pos: usize) -> u64 {
        hash_bytes(&self.buf[pos..pos + T::WIDTH])
    }
}

impl Slice for ExtendableSlice {
    fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for ExtendableSlice {
    fn drop(&mut self) {
        self.pool.free(std::mem::take(&mut self.buf));
    }
}
