//! Append-only arenas backing a FlatBuffer

use crate::config::SliceConfig;
use crate::memory::{ExtendableSlice, Pool, Scalar, Slice};
use std::sync::Arc;

/// An [`ExtendableSlice`] with a write cursor
#[derive(Debug)]
pub(crate) struct Arena {
    slice: ExtendableSlice,
    len: usize,
}

impl Arena {
    pub(crate) fn new(pool: &Arc<Pool>, config: &SliceConfig) -> Self {
        Self {
            slice: ExtendableSlice::with_config(pool, config),
            len: 0,
        }
    }

    /// Bytes written so far
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slice.capacity()
    }

    /// Append a scalar; returns its position
    #[inline]
    pub(crate) fn push<T: Scalar>(&mut self, value: T) -> usize {
        let pos = self.len;
        self.len += self.slice.write(pos, value);
        pos
    }

    /// Append raw bytes; returns their position
    #[inline]
    pub(crate) fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        let pos = self.len;
        self.len += self.slice.write_bytes(pos, bytes);
        pos
    }

    /// Overwrite a scalar inside the written range
    #[inline]
    pub(crate) fn overwrite<T: Scalar>(&mut self, pos: usize, value: T) {
        debug_assert!(pos + T::WIDTH <= self.len);
        self.slice.write(pos, value);
    }

    #[inline]
    pub(crate) fn read<T: Scalar>(&self, pos: usize) -> T {
        self.slice.read(pos)
    }

    #[inline]
    pub(crate) fn bytes(&self, pos: usize, len: usize) -> &[u8] {
        self.slice.read_bytes(pos, len)
    }

    /// Everything written so far
    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.slice.bytes()[..self.len]
    }

    /// Move the cursor back; later bytes are overwritten by the next push
    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }
}

/// Write cursors of the three arenas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    pub main: usize,
    pub data: usize,
    pub list: usize,
}

/// Fixed-width "main", variable-length "data" and list-item "list" arenas
#[derive(Debug)]
pub(crate) struct Arenas {
    pub main: Arena,
    pub data: Arena,
    pub list: Arena,
}

impl Arenas {
    pub(crate) fn new(pool: &Arc<Pool>, config: &SliceConfig) -> Self {
        Self {
            main: Arena::new(pool, config),
            data: Arena::new(pool, config),
            list: Arena::new(pool, config),
        }
    }

    #[inline]
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            main: self.main.len(),
            data: self.data.len(),
            list: self.list.len(),
        }
    }

    #[inline]
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.main.truncate(checkpoint.main);
        self.data.truncate(checkpoint.data);
        self.list.truncate(checkpoint.list);
    }

    /// Allocated bytes across all arenas
    pub(crate) fn capacity(&self) -> usize {
        self.main.capacity() + self.data.capacity() + self.list.capacity()
    }
}
