//! Packed row store
//!
//! A [`FlatBuffer`] appends rows against a fixed schema into three arenas:
//!
//! ```text
//! main  flag + fixed-width value (or 8-byte reference) per column
//! data  VARCHAR bytes
//! list  ARRAY items: flag + fixed-width value per item
//! ```
//!
//! Rows are read back through [`FlatRow`], which implements the same
//! [`crate::types::RowData`] contract rows are written from.

mod arena;
pub mod buffer;
mod codec;
pub mod layout;
pub mod row;
pub mod wire;

pub use buffer::FlatBuffer;
pub use layout::{decode_flag, encode_flag, ColumnLayout, FlatLayout, NULL_FLAG};
pub use row::{ColumnProps, FlatList, FlatRow, RowProps, RowSpan};
