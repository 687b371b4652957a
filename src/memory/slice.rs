//! Fixed-size byte slices
//!
//! [`OneSlice`] owns its bytes and gives them back to its [`Pool`] on drop;
//! [`BorrowedSlice`] views bytes owned elsewhere and never frees anything.

use super::pool::Pool;
use super::scalar::Scalar;
use rustc_hash::FxHasher;
use std::hash::Hasher;
use std::sync::Arc;

/// Hash a byte range
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Read-only view shared by every slice type
pub trait Slice {
    /// Bytes addressable through this slice
    fn bytes(&self) -> &[u8];

    /// Number of bytes
    fn size(&self) -> usize {
        self.bytes().len()
    }

    /// Typed read at `pos`
    fn read<T: Scalar>(&self, pos: usize) -> T
    where
        Self: Sized,
    {
        T::decode(&self.bytes()[pos..pos + T::WIDTH])
    }

    /// Byte range at `pos`
    fn read_bytes(&self, pos: usize, len: usize) -> &[u8] {
        &self.bytes()[pos..pos + len]
    }

    /// Hash of the byte range at `pos`
    fn hash(&self, pos: usize, len: usize) -> u64 {
        hash_bytes(self.read_bytes(pos, len))
    }

    /// Compare two byte ranges of the same slice
    fn compare(&self, pos1: usize, pos2: usize, len: usize) -> bool {
        self.read_bytes(pos1, len) == self.read_bytes(pos2, len)
    }
}

/// Owning fixed-size slice
#[derive(Debug)]
pub struct OneSlice {
    pool: Arc<Pool>,
    buf: Vec<u8>,
}

impl OneSlice {
    /// Allocate `size` zeroed bytes from `pool`
    pub fn new(pool: &Arc<Pool>, size: usize) -> Self {
        Self {
            pool: Arc::clone(pool),
            buf: pool.allocate(size),
        }
    }

    /// Typed write at `pos`; returns bytes written
    pub fn write<T: Scalar>(&mut self, pos: usize, value: T) -> usize {
        value.encode(&mut self.buf[pos..pos + T::WIDTH]);
        T::WIDTH
    }

    /// Copy `bytes` to `pos`; returns bytes written
    pub fn write_bytes(&mut self, pos: usize, bytes: &[u8]) -> usize {
        self.buf[pos..pos + bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }
}

impl Slice for OneSlice {
    fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for OneSlice {
    fn drop(&mut self) {
        self.pool.free(std::mem::take(&mut self.buf));
    }
}

/// Borrowing slice over bytes owned elsewhere
#[derive(Debug, Clone, Copy)]
pub struct BorrowedSlice<'a> {
    bytes: &'a [u8],
}

impl<'a> BorrowedSlice<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl Slice for BorrowedSlice<'_> {
    fn bytes(&self) -> &[u8] {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_slice_returns_memory_on_drop() {
        let pool = Pool::new();
        {
            let mut slice = OneSlice::new(&pool, 64);
            assert_eq!(slice.write(8, 42i64), 8);
            assert_eq!(slice.read::<i64>(8), 42);
            assert_eq!(pool.stats().live, 64);
        }
        let stats = pool.stats();
        assert_eq!(stats.freed, 64);
        assert_eq!(stats.live, 0);
    }

    #[test]
    fn test_borrowed_slice_never_frees() {
        let pool = Pool::new();
        let owned = pool.allocate(16);
        {
            let view = BorrowedSlice::new(&owned);
            assert_eq!(view.size(), 16);
            assert!(view.compare(0, 8, 8));
        }
        assert_eq!(pool.stats().freed, 0);
    }

    #[test]
    fn test_hash_matches_for_equal_ranges() {
        let pool = Pool::new();
        let mut slice = OneSlice::new(&pool, 16);
        slice.write_bytes(0, b"abcd");
        slice.write_bytes(8, b"abcd");
        assert_eq!(slice.hash(0, 4), slice.hash(8, 4));
        assert!(slice.compare(0, 8, 4));
        assert!(!slice.compare(0, 1, 4));
    }
}
