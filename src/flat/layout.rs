//! Row layout: flag bytes and per-column inline widths
//!
//! ```text
//! row := column*
//! column := flag                       (null)
//!         | flag value                 (scalar, 1/2/4/8/16 bytes)
//!         | flag u32:offset u32:len    (VARCHAR → data arena)
//!         | flag u32:count u32:offset  (ARRAY   → list arena)
//! flag := null << 7 | kind tag
//! ```

use crate::error::{Error, Result};
use crate::types::{Fields, Kind, Schema};
use rustc_hash::FxHashMap;

/// High bit of a flag byte
pub const NULL_FLAG: u8 = 0x80;

/// Flag byte for a column or list item
#[inline]
pub fn encode_flag(kind: Kind, null: bool) -> u8 {
    if null {
        kind.tag() | NULL_FLAG
    } else {
        kind.tag()
    }
}

/// Split a flag byte into (kind, is_null)
#[inline]
pub fn decode_flag(flag: u8) -> Result<(Kind, bool)> {
    let kind = Kind::from_tag(flag & !NULL_FLAG)
        .ok_or_else(|| Error::Corrupted(format!("Unknown kind tag in flag byte {:#04x}", flag)))?;
    Ok((kind, flag & NULL_FLAG != 0))
}

/// Placement of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: String,
    pub kind: Kind,
    /// Item kind of an ARRAY column
    pub item: Option<Kind>,
    /// Inline bytes when non-null, excluding the flag byte
    pub width: usize,
    /// Index among aggregate columns, if this is one
    pub sketch_slot: Option<usize>,
}

impl ColumnLayout {
    #[inline]
    pub fn is_aggregate(&self) -> bool {
        self.sketch_slot.is_some()
    }
}

/// Compiled layout of a schema + fields pair
#[derive(Debug, Clone)]
pub struct FlatLayout {
    schema: Schema,
    fields: Fields,
    columns: Vec<ColumnLayout>,
    names: FxHashMap<String, usize>,
    sketch_count: usize,
}

impl FlatLayout {
    pub fn new(schema: Schema, fields: Fields) -> Result<Self> {
        fields.validate(&schema)?;

        let mut columns = Vec::with_capacity(schema.len());
        let mut names = FxHashMap::default();
        let mut sketch_count = 0;

        for (index, (column, field)) in schema.columns().iter().zip(fields.iter()).enumerate() {
            let width = column.kind.width()?;
            let item = match column.kind {
                Kind::Array => {
                    let item = column.item.ok_or_else(|| {
                        Error::UnsupportedType(format!("ARRAY column '{}' without item type", column.name))
                    })?;
                    if !(item.is_primitive() || item == Kind::Varchar) {
                        return Err(Error::UnsupportedType(format!("ARRAY<{}>", item)));
                    }
                    Some(item)
                }
                _ => None,
            };

            let sketch_slot = if field.is_aggregate() {
                sketch_count += 1;
                Some(sketch_count - 1)
            } else {
                None
            };

            if names.insert(column.name.clone(), index).is_some() {
                return Err(Error::ContractViolation(format!(
                    "Duplicate column name '{}'",
                    column.name
                )));
            }

            columns.push(ColumnLayout {
                name: column.name.clone(),
                kind: column.kind,
                item,
                width,
                sketch_slot,
            });
        }

        Ok(Self {
            schema,
            fields,
            columns,
            names,
            sketch_count,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    pub fn column(&self, index: usize) -> &ColumnLayout {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        &self.columns
    }

    /// Get column index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Number of aggregate columns
    pub fn sketch_count(&self) -> usize {
        self.sketch_count
    }

    /// Largest row when every column is non-null (list and string payloads
    /// live in the other arenas)
    pub fn max_row_width(&self) -> usize {
        self.columns.iter().map(|c| 1 + c.width).sum()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}
