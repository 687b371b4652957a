//! Compression support for paged slices

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Compression algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    None,
    Zstd,
}

/// Compress data using specified algorithm
pub fn compress(data: &[u8], algorithm: CompressionAlgorithm, level: i32) -> Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Zstd => {
            let mut encoder = zstd::Encoder::new(Vec::with_capacity(data.len() / 2), level)
                .map_err(|e| Error::Compression(format!("Failed to create zstd encoder: {}", e)))?;
            encoder
                .write_all(data)
                .map_err(|e| Error::Compression(format!("Failed to compress: {}", e)))?;
            encoder
                .finish()
                .map_err(|e| Error::Compression(format!("Failed to finish compression: {}", e)))
        }
    }
}

/// Decompress `data` into `out`, replacing its contents.
///
/// `out` keeps its allocation between calls so one scratch buffer can serve
/// every read of a paged slice.
pub fn decompress_into(
    data: &[u8],
    algorithm: CompressionAlgorithm,
    raw_len: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.clear();
    match algorithm {
        CompressionAlgorithm::None => out.extend_from_slice(data),
        CompressionAlgorithm::Zstd => {
            out.reserve(raw_len);
            let mut decoder = zstd::Decoder::new(data)
                .map_err(|e| Error::Compression(format!("Failed to create zstd decoder: {}", e)))?;
            std::io::copy(&mut decoder, out)
                .map_err(|e| Error::Compression(format!("Failed to decompress: {}", e)))?;
        }
    }

    if out.len() != raw_len {
        return Err(Error::Corrupted(format!(
            "Decompressed {} bytes, expected {}",
            out.len(),
            raw_len
        )));
    }
    Ok(())
}

/// Compression statistics
#[derive(Debug, Clone, Serialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    pub ratio: f64,
}

impl CompressionStats {
    pub fn new(original_size: usize, compressed_size: usize) -> Self {
        let ratio = if original_size > 0 {
            compressed_size as f64 / original_size as f64
        } else {
            1.0
        };
        Self {
            original_size,
            compressed_size,
            ratio,
        }
    }

    /// Calculate space saved (percentage)
    pub fn space_saved_percent(&self) -> f64 {
        (1.0 - self.ratio) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_none() -> Result<()> {
        let data = b"Hello, World!";
        let compressed = compress(data, CompressionAlgorithm::None, 3)?;
        assert_eq!(compressed, data);

        let mut out = Vec::new();
        decompress_into(&compressed, CompressionAlgorithm::None, data.len(), &mut out)?;
        assert_eq!(out, data);
        Ok(())
    }

    #[test]
    fn test_compression_zstd() -> Result<()> {
        let data = b"row store pages compress well when values repeat. ".repeat(10);
        let compressed = compress(&data, CompressionAlgorithm::Zstd, 3)?;

        assert!(compressed.len() < data.len());

        let mut out = vec![0xAA; 7];
        decompress_into(&compressed, CompressionAlgorithm::Zstd, data.len(), &mut out)?;
        assert_eq!(out, data);
        Ok(())
    }

    #[test]
    fn test_decompress_length_mismatch() -> Result<()> {
        let data = b"abcdefgh".repeat(4);
        let compressed = compress(&data, CompressionAlgorithm::Zstd, 3)?;
        let mut out = Vec::new();
        let result = decompress_into(&compressed, CompressionAlgorithm::Zstd, 5, &mut out);
        assert!(matches!(result, Err(Error::Corrupted(_))));
        Ok(())
    }

    #[test]
    fn test_compression_stats() {
        let stats = CompressionStats::new(1000, 250);
        assert_eq!(stats.ratio, 0.25);
        assert_eq!(stats.space_saved_percent(), 75.0);
    }
}
