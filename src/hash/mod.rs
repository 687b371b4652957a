//! Hash aggregation over packed rows
//!
//! [`HashFlat`] keeps one representative row per distinct key tuple in a
//! [`crate::flat::FlatBuffer`] and folds every later row with the same key
//! into that row's aggregate sketches.

pub mod hash_flat;
pub mod keys;

pub use hash_flat::{HashFlat, Update};
pub use keys::{Key, KeyLayout};
