//! Append-only byte stream split into compressed pages
//!
//! # Architecture
//!
//! ```text
//! PagedSlice
//!   ├─→ Block 0 [0, 65536)       zstd
//!   ├─→ Block 1 [65536, 131072)  raw (did not shrink)
//!   └─→ Window  [131072, ..)     open, uncompressed
//! ```
//!
//! Writes land in the open window. A full window is sealed into a
//! [`CompressionBlock`]: compressed when that makes it smaller, kept raw
//! otherwise. Reads of sealed data decompress into one scratch buffer that
//! is reused until a different block is requested.

use super::compression::{compress, decompress_into, CompressionStats};
use super::pool::Pool;
use super::scalar::Scalar;
use crate::config::PagedConfig;
use crate::error::{Error, Result};
use crate::metrics::{PAGES_COMPRESSED_BYTES, PAGES_SEALED};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// A sealed page
#[derive(Debug)]
pub struct CompressionBlock {
    raw: Range<usize>,
    compressed: bool,
    payload: Vec<u8>,
}

impl CompressionBlock {
    /// Logical byte range covered by this block
    pub fn raw_range(&self) -> Range<usize> {
        self.raw.clone()
    }

    /// Whether the payload is compressed
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Stored payload size in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    fn covers(&self, pos: usize) -> bool {
        self.raw.contains(&pos)
    }
}

/// Paged, compressible byte stream
#[derive(Debug)]
pub struct PagedSlice {
    config: PagedConfig,
    pool: Arc<Pool>,
    window: Vec<u8>,
    window_start: usize,
    window_len: usize,
    blocks: Vec<CompressionBlock>,
    scratch: Vec<u8>,
    scratch_block: Option<usize>,
    last_block: usize,
}

impl PagedSlice {
    /// Create a paged slice with default page settings
    pub fn new(pool: &Arc<Pool>) -> Self {
        Self::with_config(pool, &PagedConfig::default())
    }

    pub fn with_config(pool: &Arc<Pool>, config: &PagedConfig) -> Self {
        Self {
            config: config.clone(),
            pool: Arc::clone(pool),
            window: pool.allocate(config.page_size),
            window_start: 0,
            window_len: 0,
            blocks: Vec::new(),
            scratch: Vec::new(),
            scratch_block: None,
            last_block: 0,
        }
    }

    /// Total logical bytes written
    pub fn size(&self) -> usize {
        self.window_start + self.window_len
    }

    /// Sealed blocks in logical order
    pub fn blocks(&self) -> &[CompressionBlock] {
        &self.blocks
    }

    /// Bytes held by sealed payloads plus the open window contents
    pub fn compressed_size(&self) -> usize {
        self.blocks.iter().map(|b| b.payload.len()).sum::<usize>() + self.window_len
    }

    /// Compression statistics over everything written so far
    pub fn stats(&self) -> CompressionStats {
        CompressionStats::new(self.size(), self.compressed_size())
    }

    /// Append `bytes`; returns the logical position they were written at.
    ///
    /// A write never straddles two blocks: if it does not fit in the open
    /// window the window is sealed first, and a write larger than a page
    /// gets a window of its own.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let len = bytes.len();
        if self.window_len > 0 && self.window_len + len > self.config.page_size {
            self.seal()?;
        }
        if len > self.window.len() {
            self.pool.extend(&mut self.window, len);
        }

        let pos = self.size();
        self.window[self.window_len..self.window_len + len].copy_from_slice(bytes);
        self.window_len += len;

        if self.window_len >= self.config.page_size {
            self.seal()?;
        }
        Ok(pos)
    }

    /// Append one encoded scalar
    pub fn write_scalar<T: Scalar>(&mut self, value: T) -> Result<usize> {
        let mut raw = [0u8; 16];
        value.encode(&mut raw);
        self.write(&raw[..T::WIDTH])
    }

    /// Seal the open window into a block (no-op when empty)
    pub fn seal(&mut self) -> Result<()> {
        if self.window_len == 0 {
            return Ok(());
        }

        let raw = &self.window[..self.window_len];
        let packed = compress(raw, self.config.compression, self.config.level)?;
        let (compressed, payload) = if packed.len() < raw.len() {
            (true, packed)
        } else {
            (false, raw.to_vec())
        };

        let start = self.window_start;
        let end = start + self.window_len;
        debug!(
            start,
            end,
            compressed,
            payload = payload.len(),
            "Sealed page"
        );
        PAGES_SEALED.inc();
        PAGES_COMPRESSED_BYTES.inc_by(payload.len() as u64);

        self.blocks.push(CompressionBlock {
            raw: start..end,
            compressed,
            payload,
        });
        self.window_start = end;
        self.window_len = 0;
        Ok(())
    }

    /// Read `len` bytes at logical position `pos`
    pub fn read(&mut self, pos: usize, len: usize) -> Result<&[u8]> {
        let end = pos + len;
        if end > self.size() {
            return Err(Error::ContractViolation(format!(
                "Read [{}, {}) beyond paged slice of {} bytes",
                pos,
                end,
                self.size()
            )));
        }

        if pos >= self.window_start {
            let offset = pos - self.window_start;
            return Ok(&self.window[offset..offset + len]);
        }

        let index = self.locate(pos);
        let block = &self.blocks[index];
        if end > block.raw.end {
            return Err(Error::ContractViolation(format!(
                "Read [{}, {}) spans block boundary at {}",
                pos, end, block.raw.end
            )));
        }

        let offset = pos - block.raw.start;
        if !block.compressed {
            return Ok(&self.blocks[index].payload[offset..offset + len]);
        }

        if self.scratch_block != Some(index) {
            self.scratch_block = None;
            decompress_into(
                &block.payload,
                self.config.compression,
                block.raw.len(),
                &mut self.scratch,
            )?;
            self.scratch_block = Some(index);
        }
        Ok(&self.scratch[offset..offset + len])
    }

    /// Read one encoded scalar at `pos`
    pub fn read_scalar<T: Scalar>(&mut self, pos: usize) -> Result<T> {
        self.read(pos, T::WIDTH).map(T::decode)
    }

    /// Index of the sealed block covering `pos`
    fn locate(&mut self, pos: usize) -> usize {
        if let Some(block) = self.blocks.get(self.last_block) {
            if block.covers(pos) {
                return self.last_block;
            }
        }
        let index = self.blocks.partition_point(|b| b.raw.end <= pos);
        self.last_block = index;
        index
    }
}

impl Drop for PagedSlice {
    fn drop(&mut self) {
        self.pool.free(std::mem::take(&mut self.window));
    }
}
