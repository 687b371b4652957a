//! Memory layer
//!
//! Zero-filled, growable byte buffers addressed by integer position.
//!
//! # Architecture
//!
//! ```text
//! Pool (explicit, shared as Arc<Pool>)
//!   ├─→ OneSlice          fixed size, owned, freed on drop
//!   ├─→ BorrowedSlice     fixed size, borrowed, never freed
//!   ├─→ ExtendableSlice   grows ×2.0 → ×1.5 → ×1.2
//!   └─→ PagedSlice        open window + sealed CompressionBlocks (zstd)
//! ```
//!
//! Scalars are stored little-endian through [`Scalar`]; nothing in this
//! layer hands out pointers that outlive the next write.

pub mod compression;
pub mod extendable;
pub mod paged;
pub mod pool;
pub mod scalar;
pub mod slice;

pub use compression::{compress, decompress_into, CompressionAlgorithm, CompressionStats};
pub use extendable::{ExtendableSlice, GrowthPolicy};
pub use paged::{CompressionBlock, PagedSlice};
pub use pool::{Pool, PoolStats};
pub use scalar::Scalar;
pub use slice::{hash_bytes, BorrowedSlice, OneSlice, Slice};
