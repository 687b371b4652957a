//! HashFlat - one stored row per distinct key tuple
//!
//! # Update
//!
//! ```text
//! update(row)
//!   ├─→ add(row)                      speculative append
//!   ├─→ hash(new) → probe key set
//!   ├─→ match:    merge aggregates into the existing row, rollback
//!   └─→ no match: attach fresh sketches, self-merge, insert key
//! ```
//!
//! Non-aggregate fields are keys; aggregate fields are values whose state
//! lives in the sketch attached to the group's representative row.

use super::keys::{Key, KeyLayout};
use crate::aggregate::Sketcher;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::flat::{FlatBuffer, FlatRow};
use crate::memory::Pool;
use crate::metrics::{GROUPS_CREATED, ROWS_MERGED};
use crate::types::{Fields, OwnedRow, RowData, Schema};
use hashbrown::HashTable;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of [`HashFlat::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// The row started a new group stored at this row id
    Created(usize),
    /// The row was merged into the group stored at this row id
    Merged(usize),
}

impl Update {
    /// Row id of the group
    pub fn row(&self) -> usize {
        match self {
            Update::Created(row) | Update::Merged(row) => *row,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Update::Created(_))
    }
}

/// Grouping store over a [`FlatBuffer`]
pub struct HashFlat {
    flat: FlatBuffer,
    keys: Vec<usize>,
    values: Vec<usize>,
    sketchers: Vec<Sketcher>,
    key_layout: KeyLayout,
    table: HashTable<Key>,
}

impl HashFlat {
    pub fn new(pool: &Arc<Pool>, schema: Schema, fields: Fields) -> Result<Self> {
        Self::with_config(pool, schema, fields, &EngineConfig::default())
    }

    pub fn with_config(
        pool: &Arc<Pool>,
        schema: Schema,
        fields: Fields,
        config: &EngineConfig,
    ) -> Result<Self> {
        let flat = FlatBuffer::with_config(pool, schema, fields, &config.slice)?;
        Self::init(flat, config.hash.expected_groups)
    }

    /// Split columns into keys and values and pick the key layout
    fn init(flat: FlatBuffer, expected_groups: usize) -> Result<Self> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut sketchers = Vec::new();
        for (col, field) in flat.fields().iter().enumerate() {
            match field.spec() {
                Some(spec) => {
                    spec.validate()?;
                    values.push(col);
                    sketchers.push(Arc::clone(&spec.sketcher));
                }
                None => keys.push(col),
            }
        }

        if keys.is_empty() {
            warn!("No key columns, every row merges into a single group");
        }

        let key_layout = KeyLayout::detect(flat.layout(), &keys);
        info!(
            keys = keys.len(),
            values = values.len(),
            contiguous = key_layout.is_contiguous(),
            "Initialized hash aggregation"
        );

        Ok(Self {
            flat,
            keys,
            values,
            sketchers,
            key_layout,
            table: HashTable::with_capacity(expected_groups),
        })
    }

    /// Number of groups
    #[inline]
    pub fn len(&self) -> usize {
        self.flat.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Group row ids in first-seen order
    pub fn iter(&self) -> Range<usize> {
        self.flat.iter()
    }

    pub fn flat(&self) -> &FlatBuffer {
        &self.flat
    }

    pub fn into_flat(self) -> FlatBuffer {
        self.flat
    }

    /// Key column indices
    pub fn keys(&self) -> &[usize] {
        &self.keys
    }

    /// Aggregate column indices
    pub fn value_columns(&self) -> &[usize] {
        &self.values
    }

    pub fn key_layout(&self) -> &KeyLayout {
        &self.key_layout
    }

    /// Borrowed accessor for group row `id`
    pub fn row(&self, id: usize) -> Result<FlatRow<'_>> {
        self.flat.row(id)
    }

    /// Finalized copy of group row `id`
    pub fn crow(&self, id: usize) -> Result<OwnedRow> {
        self.flat.crow(id)
    }

    /// Drop every group
    pub fn clear(&mut self) {
        self.flat.clear();
        self.table.clear();
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Key hash of row `id`
    pub fn hash(&self, id: usize) -> Result<u64> {
        match &self.key_layout {
            KeyLayout::Contiguous { first, last } => {
                Ok(self.flat.hash_range(self.flat.key_range(id, *first, *last)?))
            }
            KeyLayout::Columns(cols) => self.flat.hash(id, cols),
        }
    }

    /// Whether rows `a` and `b` have the same key
    pub fn equal(&self, a: usize, b: usize) -> Result<bool> {
        match &self.key_layout {
            KeyLayout::Contiguous { first, last } => Ok(self.flat.equal_ranges(
                self.flat.key_range(a, *first, *last)?,
                self.flat.key_range(b, *first, *last)?,
            )),
            KeyLayout::Columns(cols) => self.flat.equal(a, b, cols),
        }
    }

    /// Key hash through the per-column path, whatever the key layout
    pub fn generic_hash(&self, id: usize) -> Result<u64> {
        self.flat.hash(id, &self.keys)
    }

    /// Key comparison through the per-column path, whatever the key layout
    pub fn generic_equal(&self, a: usize, b: usize) -> Result<bool> {
        self.flat.equal(a, b, &self.keys)
    }

    /// Existing group whose key equals row `id`'s
    fn find(&self, hash: u64, id: usize) -> Result<Option<usize>> {
        let mut failure = None;
        let found = self
            .table
            .find(hash, |key| {
                key.hash == hash
                    && match self.equal(key.row, id) {
                        Ok(equal) => equal,
                        Err(e) => {
                            failure.get_or_insert(e);
                            false
                        }
                    }
            })
            .map(|key| key.row);
        match failure {
            Some(e) => Err(e),
            None => Ok(found),
        }
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// Add a row to its group, creating the group if its key is new
    pub fn update(&mut self, row: &dyn RowData) -> Result<Update> {
        self.flat.add(row)?;
        let id = self.flat.len() - 1;
        self.place(id).inspect_err(|_| {
            self.flat.rollback();
        })
    }

    fn place(&mut self, id: usize) -> Result<Update> {
        let hash = self.hash(id)?;

        if let Some(existing) = self.find(hash, id)? {
            self.flat.merge_sketches(id, existing, &self.values)?;
            self.flat.rollback();
            ROWS_MERGED.inc();
            return Ok(Update::Merged(existing));
        }

        for (&col, sketcher) in self.values.iter().zip(&self.sketchers) {
            self.flat.attach_sketch(id, col, sketcher())?;
        }
        self.flat.merge_sketches(id, id, &self.values)?;
        self.table.insert_unique(hash, Key { row: id, hash }, |key| key.hash);
        GROUPS_CREATED.inc();
        Ok(Update::Created(id))
    }

    /// Merge another partial result into this one, group by group
    pub fn mix(&mut self, other: &HashFlat) -> Result<()> {
        if self.flat.schema() != other.flat.schema() {
            return Err(Error::ContractViolation(
                "Cannot mix hash aggregations over different schemas".to_string(),
            ));
        }
        for other_id in other.iter() {
            // raw stored bytes, so keys survive whatever their encoding
            self.flat.add(&other.flat.raw_row(other_id)?)?;
            let id = self.flat.len() - 1;
            if let Err(e) = self.absorb(id, other, other_id) {
                self.flat.rollback();
                return Err(e);
            }
        }
        Ok(())
    }

    fn absorb(&mut self, id: usize, other: &HashFlat, other_id: usize) -> Result<()> {
        let hash = self.hash(id)?;
        let existing = self.find(hash, id)?;

        for (&col, sketcher) in self.values.iter().zip(&self.sketchers) {
            let theirs = other.flat.sketch(other_id, col).ok_or_else(|| {
                Error::ContractViolation(format!(
                    "Group row {} has no sketch for column {}",
                    other_id, col
                ))
            })?;
            match existing {
                Some(row) => {
                    let ours = self.flat.sketch_mut(row, col).ok_or_else(|| {
                        Error::ContractViolation(format!(
                            "Group row {} has no sketch for column {}",
                            row, col
                        ))
                    })?;
                    ours.mix(theirs.as_sketch())?;
                }
                None => {
                    let mut sketch = sketcher();
                    sketch.mix(theirs.as_sketch())?;
                    self.flat.attach_sketch(id, col, sketch)?;
                }
            }
        }

        match existing {
            Some(_) => {
                self.flat.rollback();
                ROWS_MERGED.inc();
            }
            None => {
                self.table.insert_unique(hash, Key { row: id, hash }, |key| key.hash);
                GROUPS_CREATED.inc();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sketch state
    // ------------------------------------------------------------------

    /// Serialized sketches of group row `id`, in aggregate column order
    pub fn serialize_sketches(&self, id: usize) -> Result<Vec<u8>> {
        self.flat.span(id)?;
        let mut buf = Vec::new();
        for &col in &self.values {
            let sketch = self.flat.sketch(id, col).ok_or_else(|| {
                Error::ContractViolation(format!(
                    "Group row {} has no sketch for column {}",
                    id, col
                ))
            })?;
            sketch.serialize(&mut buf);
        }
        Ok(buf)
    }

    /// Replace the sketches of group row `id` with serialized state;
    /// returns bytes consumed
    pub fn load_sketches(&mut self, id: usize, bytes: &[u8]) -> Result<usize> {
        self.flat.span(id)?;
        let mut pos = 0;
        let mut loaded = Vec::with_capacity(self.values.len());
        for (&col, sketcher) in self.values.iter().zip(&self.sketchers) {
            let mut sketch = sketcher();
            pos += sketch.load(bytes.get(pos..).unwrap_or(&[]))?;
            loaded.push((col, sketch));
        }
        for (col, sketch) in loaded {
            self.flat.attach_sketch(id, col, sketch)?;
        }
        Ok(pos)
    }
}

impl fmt::Debug for HashFlat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashFlat")
            .field("groups", &self.flat.len())
            .field("keys", &self.keys)
            .field("values", &self.values)
            .field("key_layout", &self.key_layout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{builtin, AggregateSpec, Aggregator, MergeProperties, Sketch};
    use crate::row;
    use crate::types::{Column, Field, Kind, Value};
    use std::any::Any;

    fn keyed_sum() -> Result<(Schema, Fields)> {
        let schema = Schema::new(vec![
            Column::new("key", Kind::BigInt),
            Column::new("val", Kind::BigInt),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::BigInt),
            Field::aggregate(builtin::sum(Kind::BigInt)?),
        ]);
        Ok((schema, fields))
    }

    #[test]
    fn test_groups_in_first_seen_order() -> Result<()> {
        let (schema, fields) = keyed_sum()?;
        let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
        assert!(hash.key_layout().is_contiguous());

        assert_eq!(hash.update(&row![1i64, 5i64])?, Update::Created(0));
        assert_eq!(hash.update(&row![1i64, 7i64])?, Update::Merged(0));
        assert_eq!(hash.update(&row![2i64, 2i64])?, Update::Created(1));

        assert_eq!(hash.len(), 2);
        assert_eq!(hash.crow(0)?, row![1i64, 12i64]);
        assert_eq!(hash.crow(1)?, row![2i64, 2i64]);
        Ok(())
    }

    #[test]
    fn test_null_key_is_its_own_group() -> Result<()> {
        let (schema, fields) = keyed_sum()?;
        let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
        hash.update(&row![0i64, 1i64])?;
        hash.update(&row![None::<i64>, 2i64])?;
        hash.update(&row![None::<i64>, 3i64])?;
        hash.update(&row![0i64, 4i64])?;

        assert_eq!(hash.len(), 2);
        assert_eq!(hash.crow(0)?, row![0i64, 5i64]);
        assert_eq!(hash.crow(1)?, row![None::<i64>, 5i64]);
        Ok(())
    }

    #[test]
    fn test_zero_keys_collapse() -> Result<()> {
        let schema = Schema::new(vec![Column::new("val", Kind::Integer)]);
        let fields = Fields::new(vec![Field::aggregate(builtin::count(Kind::Integer)?)]);
        let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
        for i in 0..10i32 {
            hash.update(&row![i])?;
        }
        assert_eq!(hash.len(), 1);
        assert_eq!(hash.crow(0)?, row![10i64]);
        Ok(())
    }

    #[test]
    fn test_varchar_keys_use_column_path() -> Result<()> {
        let schema = Schema::new(vec![
            Column::new("region", Kind::Varchar),
            Column::new("score", Kind::Double),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::Varchar),
            Field::aggregate(builtin::max(Kind::Double)?),
        ]);
        let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
        assert!(!hash.key_layout().is_contiguous());

        hash.update(&row!["north", 1.0f64])?;
        hash.update(&row!["south", 4.0f64])?;
        hash.update(&row!["north", 3.0f64])?;
        hash.update(&row!["nort", 9.0f64])?;

        assert_eq!(hash.len(), 3);
        assert_eq!(hash.crow(0)?, row!["north", 3.0f64]);
        assert_eq!(hash.crow(2)?, row!["nort", 9.0f64]);
        Ok(())
    }

    #[test]
    fn test_contiguous_and_generic_paths_agree() -> Result<()> {
        let schema = Schema::new(vec![
            Column::new("a", Kind::Integer),
            Column::new("b", Kind::Double),
            Column::new("n", Kind::BigInt),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::Integer),
            Field::plain(Kind::Double),
            Field::aggregate(builtin::count(Kind::BigInt)?),
        ]);
        let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
        hash.update(&row![1i32, 0.5f64, 1i64])?;
        hash.update(&row![None::<i32>, 0.5f64, 1i64])?;
        hash.update(&row![1i32, None::<f64>, 1i64])?;
        hash.update(&row![1i32, -0.0f64, 1i64])?;
        hash.update(&row![1i32, 0.0f64, 1i64])?;

        assert_eq!(hash.len(), 5);
        for id in hash.iter() {
            assert_eq!(hash.hash(id)?, hash.generic_hash(id)?);
            for other in hash.iter() {
                assert_eq!(hash.equal(id, other)?, hash.generic_equal(id, other)?);
                assert_eq!(hash.equal(id, other)?, id == other);
            }
        }
        Ok(())
    }

    #[derive(Debug, Default)]
    struct Last(Option<Value>);

    impl Sketch for Last {
        fn fit(&self, _size_hint: usize) -> bool {
            false
        }

        fn serialize(&self, _buf: &mut Vec<u8>) -> usize {
            0
        }

        fn load(&mut self, _buf: &[u8]) -> Result<usize> {
            Ok(0)
        }

        fn mix(&mut self, _other: &dyn Sketch) -> Result<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Aggregator for Last {
        fn merge(&mut self, value: &Value) {
            self.0 = Some(value.clone());
        }

        fn finalize(&self) -> Value {
            self.0.clone().unwrap_or(Value::Null)
        }

        fn properties(&self) -> MergeProperties {
            MergeProperties {
                associative: true,
                commutative: false,
            }
        }

        fn as_sketch(&self) -> &dyn Sketch {
            self
        }
    }

    #[test]
    fn test_order_sensitive_aggregator_rejected() {
        let schema = Schema::new(vec![
            Column::new("key", Kind::Integer),
            Column::new("val", Kind::Integer),
        ]);
        let spec = AggregateSpec::new(
            "last",
            Kind::Integer,
            Kind::Integer,
            Arc::new(|| Box::new(Last::default()) as Box<dyn Aggregator>),
        );
        let fields = Fields::new(vec![Field::plain(Kind::Integer), Field::aggregate(spec)]);
        assert!(matches!(
            HashFlat::new(&Pool::new(), schema, fields),
            Err(Error::Aggregate(_))
        ));
    }

    #[test]
    fn test_mix_partials() -> Result<()> {
        let pool = Pool::new();
        let (schema, fields) = keyed_sum()?;
        let mut left = HashFlat::new(&pool, schema.clone(), fields.clone())?;
        let mut right = HashFlat::new(&pool, schema, fields)?;

        left.update(&row![1i64, 5i64])?;
        left.update(&row![2i64, 1i64])?;
        right.update(&row![2i64, 10i64])?;
        right.update(&row![3i64, 7i64])?;
        right.update(&row![1i64, 7i64])?;

        left.mix(&right)?;
        assert_eq!(left.len(), 3);
        assert_eq!(left.crow(0)?, row![1i64, 12i64]);
        assert_eq!(left.crow(1)?, row![2i64, 11i64]);
        assert_eq!(left.crow(2)?, row![3i64, 7i64]);
        Ok(())
    }

    #[test]
    fn test_mix_keeps_non_utf8_keys_apart() -> Result<()> {
        let pool = Pool::new();
        let schema = Schema::new(vec![
            Column::new("key", Kind::Varchar),
            Column::new("val", Kind::BigInt),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::Varchar),
            Field::aggregate(builtin::sum(Kind::BigInt)?),
        ]);
        let keyed = |key: &[u8], val: i64| {
            OwnedRow::new(vec![Value::Bytes(key.to_vec()), Value::BigInt(val)])
        };
        let mut left = HashFlat::new(&pool, schema.clone(), fields.clone())?;
        let mut right = HashFlat::new(&pool, schema, fields)?;

        left.update(&keyed(&[0xFE], 1))?;
        right.update(&keyed(&[0xFF], 2))?;
        right.update(&keyed(&[0xFE], 3))?;
        right.update(&keyed(&[0xFF], 4))?;
        assert_eq!(right.len(), 2);

        left.mix(&right)?;
        assert_eq!(left.len(), 2);
        assert_eq!(left.row(0)?.read_string(0), [0xFEu8]);
        assert_eq!(left.row(1)?.read_string(0), [0xFFu8]);
        assert_eq!(left.crow(0)?, keyed(&[0xFE], 4));
        assert_eq!(left.crow(1)?, keyed(&[0xFF], 6));
        Ok(())
    }

    #[test]
    fn test_sketch_state_round_trip() -> Result<()> {
        let pool = Pool::new();
        let (schema, fields) = keyed_sum()?;
        let mut source = HashFlat::new(&pool, schema.clone(), fields.clone())?;
        source.update(&row![4i64, 20i64])?;
        source.update(&row![4i64, 22i64])?;
        let state = source.serialize_sketches(0)?;

        let mut target = HashFlat::new(&pool, schema, fields)?;
        target.update(&row![4i64, 0i64])?;
        assert_eq!(target.load_sketches(0, &state)?, state.len());
        assert_eq!(target.crow(0)?, row![4i64, 42i64]);

        assert!(target.load_sketches(0, &state[..3]).is_err());
        assert!(target.serialize_sketches(5).is_err());
        Ok(())
    }

    #[test]
    fn test_clear_resets_groups() -> Result<()> {
        let (schema, fields) = keyed_sum()?;
        let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
        hash.update(&row![1i64, 1i64])?;
        hash.clear();
        assert!(hash.is_empty());
        assert_eq!(hash.update(&row![1i64, 1i64])?, Update::Created(0));
        Ok(())
    }
}
