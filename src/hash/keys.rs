//! Group keys and key-column layout

use crate::flat::FlatLayout;

/// Entry of the group key set
///
/// Identity is by key-column values; the row id only names the group's
/// representative row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub row: usize,
    pub hash: u64,
}

/// How key columns are hashed and compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLayout {
    /// Adjacent fixed-width key columns `first..=last`, hashed and compared
    /// as one packed byte range
    Contiguous { first: usize, last: usize },
    /// Per-column hashing and comparison
    Columns(Vec<usize>),
}

impl KeyLayout {
    /// Pick the contiguous layout only when every key column is primitive
    /// and the key columns are adjacent in schema order
    pub fn detect(layout: &FlatLayout, keys: &[usize]) -> Self {
        let primitive = keys.iter().all(|&k| layout.column(k).kind.is_primitive());
        let adjacent = keys.windows(2).all(|w| w[1] == w[0] + 1);

        match (keys.first(), keys.last()) {
            (Some(&first), Some(&last)) if primitive && adjacent => {
                KeyLayout::Contiguous { first, last }
            }
            _ => KeyLayout::Columns(keys.to_vec()),
        }
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        matches!(self, KeyLayout::Contiguous { .. })
    }
}
