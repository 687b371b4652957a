//! FlatBuffer - append-only packed row store
//!
//! # Architecture
//!
//! ```text
//! add(row)
//!   ├─→ begin_row    checkpoint the three arena cursors
//!   ├─→ per column   flag byte + inline value        → main
//!   │                string bytes                    → data
//!   │                item flags + inline item values → list
//!   └─→ commit_row   record RowSpan, remember checkpoint for rollback
//! ```
//!
//! Rows are addressed by id (append order). Aggregate columns may carry an
//! attached sketch per row; the packed bytes of such a column keep the value
//! the row was written with.

use super::arena::{Arenas, Checkpoint};
use super::codec::{ColumnCodec, KeyBytes};
use super::layout::{encode_flag, FlatLayout};
use super::row::{ColumnProps, FlatRow, RowProps, RowSpan};
use crate::aggregate::Aggregator;
use crate::config::SliceConfig;
use crate::error::{Error, Result};
use crate::memory::{hash_bytes, Pool};
use crate::types::{Fields, Kind, OwnedRow, RowData, Schema, Value};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// Schema-driven packed row store
pub struct FlatBuffer {
    pool: Arc<Pool>,
    config: SliceConfig,
    layout: FlatLayout,
    codecs: Vec<ColumnCodec>,
    arenas: Arenas,
    rows: Vec<RowSpan>,
    /// `rows.len() * layout.sketch_count()` slots, row-major
    sketches: Vec<Option<Box<dyn Aggregator>>>,
    /// Checkpoint of the row being written
    open: Option<Checkpoint>,
    /// Checkpoint taken before the last committed row
    last: Option<Checkpoint>,
}

impl FlatBuffer {
    /// Create a buffer with default slice limits
    pub fn new(pool: &Arc<Pool>, schema: Schema, fields: Fields) -> Result<Self> {
        Self::with_config(pool, schema, fields, &SliceConfig::default())
    }

    pub fn with_config(
        pool: &Arc<Pool>,
        schema: Schema,
        fields: Fields,
        config: &SliceConfig,
    ) -> Result<Self> {
        let layout = FlatLayout::new(schema, fields)?;
        let codecs = layout
            .columns()
            .iter()
            .map(|c| ColumnCodec::new(c.kind, c.item))
            .collect::<Result<Vec<_>>>()?;

        info!(
            columns = layout.len(),
            aggregates = layout.sketch_count(),
            max_row_width = layout.max_row_width(),
            "Created flat buffer"
        );

        Ok(Self {
            pool: Arc::clone(pool),
            config: config.clone(),
            layout,
            codecs,
            arenas: Arenas::new(pool, config),
            rows: Vec::new(),
            sketches: Vec::new(),
            open: None,
            last: None,
        })
    }

    pub fn schema(&self) -> &Schema {
        self.layout.schema()
    }

    pub fn fields(&self) -> &Fields {
        self.layout.fields()
    }

    pub fn layout(&self) -> &FlatLayout {
        &self.layout
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    /// Number of committed rows
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Committed row spans in append order
    pub fn rows(&self) -> &[RowSpan] {
        &self.rows
    }

    /// Row ids in append order
    pub fn iter(&self) -> Range<usize> {
        0..self.rows.len()
    }

    /// Bytes allocated for this buffer
    pub fn memory_usage(&self) -> usize {
        self.arenas.capacity()
            + self.rows.capacity() * std::mem::size_of::<RowSpan>()
            + self.sketches.capacity() * std::mem::size_of::<Option<Box<dyn Aggregator>>>()
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Open a row; returns its starting offset in "main"
    pub fn begin_row(&mut self) -> Result<usize> {
        if self.open.is_some() {
            return Err(Error::ContractViolation(
                "begin_row with a row already open".to_string(),
            ));
        }
        let checkpoint = self.arenas.checkpoint();
        self.open = Some(checkpoint);
        Ok(checkpoint.main)
    }

    /// Write every column of `row` into the open row
    fn write_row(&mut self, row: &dyn RowData) -> Result<()> {
        for (col, codec) in self.codecs.iter().enumerate() {
            let kind = self.layout.column(col).kind;
            let null = row.is_null(col);
            self.arenas.main.push(encode_flag(kind, null));
            if !null {
                codec.write(row, col, &mut self.arenas)?;
            }
        }
        Ok(())
    }

    /// Commit the open row; returns its id
    pub fn commit_row(&mut self) -> Result<usize> {
        let checkpoint = self
            .open
            .take()
            .ok_or_else(|| Error::ContractViolation("commit_row without begin_row".to_string()))?;
        self.rows.push(RowSpan {
            offset: checkpoint.main,
            len: self.arenas.main.len() - checkpoint.main,
        });
        self.sketches
            .extend((0..self.layout.sketch_count()).map(|_| None));
        self.last = Some(checkpoint);
        Ok(self.rows.len() - 1)
    }

    /// Discard everything written since `begin_row`
    pub fn abandon_row(&mut self) -> Result<()> {
        let checkpoint = self
            .open
            .take()
            .ok_or_else(|| Error::ContractViolation("abandon_row without begin_row".to_string()))?;
        self.arenas.restore(checkpoint);
        Ok(())
    }

    /// Append a row; returns its starting offset in "main"
    ///
    /// The new row's id is `len() - 1`. A failed write leaves the buffer
    /// as it was.
    pub fn add(&mut self, row: &dyn RowData) -> Result<usize> {
        let offset = self.begin_row()?;
        if let Err(e) = self.write_row(row) {
            self.abandon_row()?;
            return Err(e);
        }
        self.commit_row()?;
        Ok(offset)
    }

    /// Undo the most recent `add`; returns the discarded row's size in
    /// "main", or 0 if there is nothing to undo
    pub fn rollback(&mut self) -> usize {
        if self.open.is_some() {
            debug!("rollback ignored while a row is open");
            return 0;
        }
        let Some(checkpoint) = self.last.take() else {
            return 0;
        };
        let Some(span) = self.rows.pop() else {
            return 0;
        };
        self.sketches.truncate(self.rows.len() * self.layout.sketch_count());
        self.arenas.restore(checkpoint);
        span.len
    }

    /// Drop every row
    pub fn clear(&mut self) {
        self.arenas.restore(Checkpoint {
            main: 0,
            data: 0,
            list: 0,
        });
        self.rows.clear();
        self.sketches.clear();
        self.open = None;
        self.last = None;
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    pub fn span(&self, id: usize) -> Result<RowSpan> {
        self.rows.get(id).copied().ok_or_else(|| {
            Error::ContractViolation(format!("Row {} out of range ({} rows)", id, self.rows.len()))
        })
    }

    /// Per-column properties of row `id`
    pub fn props(&self, id: usize) -> Result<RowProps> {
        RowProps::scan(&self.layout, &self.arenas.main, self.span(id)?)
    }

    /// Borrowed accessor for row `id`
    pub fn row(&self, id: usize) -> Result<FlatRow<'_>> {
        let props = self.props(id)?;
        Ok(FlatRow::new(self, id, props))
    }

    /// Independent copy of row `id`
    pub fn crow(&self, id: usize) -> Result<OwnedRow> {
        Ok(self.row(id)?.to_owned_row())
    }

    /// Value of `col` in row `id` as written, ignoring any sketch
    pub fn stored_value(&self, id: usize, col: usize) -> Result<Value> {
        self.check_column(col)?;
        let props = self.props(id)?;
        Ok(self.decode(col, props.column(col)))
    }

    /// Borrowed accessor for row `id` as written, ignoring any sketch
    ///
    /// Adding this row to another buffer copies every column byte for byte.
    pub fn raw_row(&self, id: usize) -> Result<FlatRow<'_>> {
        let props = self.props(id)?;
        Ok(FlatRow::raw(self, id, props))
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Hash of the listed columns of row `id`
    ///
    /// Each column contributes its flag byte followed by its canonical value
    /// bytes, so primitive columns hash exactly their packed bytes.
    pub fn hash(&self, id: usize, cols: &[usize]) -> Result<u64> {
        let props = self.props(id)?;
        let mut key = KeyBytes::new();
        for &col in cols {
            self.check_column(col)?;
            let cp = props.column(col);
            key.push(encode_flag(cp.kind, cp.null));
            if !cp.null {
                self.codecs[col].hash(&self.arenas, cp.offset, &mut key);
            }
        }
        Ok(hash_bytes(&key))
    }

    /// Whether rows `a` and `b` agree on the listed columns
    ///
    /// Two nulls are equal; a null never equals a non-null. Floats compare
    /// bitwise.
    pub fn equal(&self, a: usize, b: usize, cols: &[usize]) -> Result<bool> {
        let left = self.props(a)?;
        let right = self.props(b)?;
        for &col in cols {
            self.check_column(col)?;
            let (l, r) = (left.column(col), right.column(col));
            match (l.null, r.null) {
                (true, true) => continue,
                (false, false) => {
                    if !self.codecs[col].equal(&self.arenas, l.offset, r.offset) {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Packed bytes from the flag of `first` to the end of `last`
    pub(crate) fn key_range(&self, id: usize, first: usize, last: usize) -> Result<Range<usize>> {
        let props = self.props(id)?;
        Ok(props.column(first).flag_offset()..props.column(last).end())
    }

    /// Hash of a packed byte range of "main"
    pub(crate) fn hash_range(&self, range: Range<usize>) -> u64 {
        hash_bytes(self.arenas.main.bytes(range.start, range.len()))
    }

    /// Compare two packed byte ranges of "main"
    pub(crate) fn equal_ranges(&self, a: Range<usize>, b: Range<usize>) -> bool {
        a.len() == b.len()
            && self.arenas.main.bytes(a.start, a.len()) == self.arenas.main.bytes(b.start, b.len())
    }

    // ------------------------------------------------------------------
    // Copy and sketches
    // ------------------------------------------------------------------

    /// Combine the listed columns of row `from` into row `to`
    ///
    /// `callback(column, kind, old, new)` receives the current value in `to`
    /// and the value in `from` (None for null) and may return a value to
    /// store in `to`. Only non-null fixed-width slots of the same kind can
    /// be rewritten.
    pub fn copy<F>(&mut self, from: usize, to: usize, cols: &[usize], mut callback: F) -> Result<()>
    where
        F: FnMut(usize, Kind, Option<&Value>, Option<&Value>) -> Option<Value>,
    {
        let source = self.props(from)?;
        let target = self.props(to)?;
        for &col in cols {
            self.check_column(col)?;
            let slot = *target.column(col);
            let old = self.decode(col, &slot);
            let new = self.decode(col, source.column(col));
            let out = callback(
                col,
                slot.kind,
                (!old.is_null()).then_some(&old),
                (!new.is_null()).then_some(&new),
            );
            if let Some(out) = out {
                if slot.null || !self.codecs[col].overwrite(&mut self.arenas, slot.offset, &out) {
                    return Err(Error::ContractViolation(format!(
                        "Cannot store {:?} into column {} of row {}",
                        out, col, to
                    )));
                }
            }
        }
        Ok(())
    }

    /// Merge the stored values of `cols` in row `from` into the sketches
    /// attached to row `to`
    ///
    /// Walks the flag bytes of `from` once for all columns.
    pub fn merge_sketches(&mut self, from: usize, to: usize, cols: &[usize]) -> Result<()> {
        let source = self.props(from)?;
        for &col in cols {
            let index = self.sketch_index(to, col)?;
            let value = self.decode(col, source.column(col));
            let sketch = self.sketches[index].as_mut().ok_or_else(|| {
                Error::ContractViolation(format!("Row {} has no sketch for column {}", to, col))
            })?;
            sketch.merge(&value);
        }
        Ok(())
    }

    fn sketch_index(&self, id: usize, col: usize) -> Result<usize> {
        self.span(id)?;
        self.check_column(col)?;
        let slot = self.layout.column(col).sketch_slot.ok_or_else(|| {
            Error::ContractViolation(format!("Column {} is not an aggregate column", col))
        })?;
        Ok(id * self.layout.sketch_count() + slot)
    }

    /// Attach a sketch to an aggregate column; returns the one it replaces
    pub fn attach_sketch(
        &mut self,
        id: usize,
        col: usize,
        sketch: Box<dyn Aggregator>,
    ) -> Result<Option<Box<dyn Aggregator>>> {
        let index = self.sketch_index(id, col)?;
        Ok(self.sketches[index].replace(sketch))
    }

    /// Detach and return the sketch of an aggregate column
    pub fn take_sketch(&mut self, id: usize, col: usize) -> Result<Option<Box<dyn Aggregator>>> {
        let index = self.sketch_index(id, col)?;
        Ok(self.sketches[index].take())
    }

    pub fn sketch(&self, id: usize, col: usize) -> Option<&dyn Aggregator> {
        let index = self.sketch_index(id, col).ok()?;
        self.sketches[index].as_deref()
    }

    pub fn sketch_mut(&mut self, id: usize, col: usize) -> Option<&mut Box<dyn Aggregator>> {
        let index = self.sketch_index(id, col).ok()?;
        self.sketches[index].as_mut()
    }

    // ------------------------------------------------------------------
    // Crate internals
    // ------------------------------------------------------------------

    fn check_column(&self, col: usize) -> Result<()> {
        if col >= self.layout.len() {
            return Err(Error::ContractViolation(format!(
                "Column {} out of range ({} columns)",
                col,
                self.layout.len()
            )));
        }
        Ok(())
    }

    /// Decode a column from its properties
    pub(crate) fn decode(&self, col: usize, props: &ColumnProps) -> Value {
        if props.null {
            Value::Null
        } else {
            self.codecs[col].read(&self.arenas, props.offset)
        }
    }

    /// Finalized values of the attached sketches of row `id`
    pub(crate) fn finalized(&self, id: usize) -> SmallVec<[(usize, Value); 2]> {
        let stride = self.layout.sketch_count();
        let mut finals = SmallVec::new();
        if stride == 0 {
            return finals;
        }
        for (col, column) in self.layout.columns().iter().enumerate() {
            if let Some(slot) = column.sketch_slot {
                if let Some(sketch) = &self.sketches[id * stride + slot] {
                    finals.push((col, sketch.finalize()));
                }
            }
        }
        finals
    }

    pub(crate) fn has_open_row(&self) -> bool {
        self.open.is_some()
    }

    pub(crate) fn arenas(&self) -> &Arenas {
        &self.arenas
    }

    pub(crate) fn codec(&self, col: usize) -> &ColumnCodec {
        &self.codecs[col]
    }

    /// Replace the contents with already-packed arenas and spans
    pub(crate) fn load_parts(&mut self, main: &[u8], data: &[u8], list: &[u8], rows: Vec<RowSpan>) {
        self.clear();
        self.arenas.main.push_bytes(main);
        self.arenas.data.push_bytes(data);
        self.arenas.list.push_bytes(list);
        self.sketches = (0..rows.len() * self.layout.sketch_count()).map(|_| None).collect();
        self.rows = rows;
    }
}

impl fmt::Debug for FlatBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatBuffer")
            .field("columns", &self.layout.len())
            .field("rows", &self.rows.len())
            .field("main", &self.arenas.main.len())
            .field("data", &self.arenas.data.len())
            .field("list", &self.arenas.list.len())
            .field("open", &self.open.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::builtin;
    use crate::row;
    use crate::types::{Column, Field};

    fn people() -> (Schema, Fields) {
        let schema = Schema::new(vec![
            Column::new("id", Kind::BigInt),
            Column::new("name", Kind::Varchar),
            Column::new("score", Kind::Double),
            Column::array("tags", Kind::Varchar),
        ]);
        let fields = Fields::plain(&schema);
        (schema, fields)
    }

    fn buffer() -> Result<FlatBuffer> {
        let (schema, fields) = people();
        FlatBuffer::new(&Pool::new(), schema, fields)
    }

    #[test]
    fn test_add_and_read_back() -> Result<()> {
        let mut flat = buffer()?;
        let first = row![1i64, "ada", 9.5f64, vec!["x", "y"]];
        let second = row![2i64, None::<&str>, None::<f64>, Value::Array(vec![Value::Null])];

        assert_eq!(flat.add(&first)?, 0);
        let offset = flat.add(&second)?;
        assert_eq!(offset, flat.rows()[0].len);
        assert_eq!(flat.len(), 2);

        assert_eq!(flat.crow(0)?, first);
        assert_eq!(flat.crow(1)?, second);

        let view = flat.row(0)?;
        assert_eq!(view.read_long(0), 1);
        assert_eq!(view.read_string(1), b"ada");
        let tags = view.read_list(3);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.read_string(1), b"y");
        Ok(())
    }

    #[test]
    fn test_null_column_takes_one_byte() -> Result<()> {
        let mut flat = buffer()?;
        flat.add(&row![None::<i64>, None::<&str>, None::<f64>, None::<i32>])?;
        assert_eq!(flat.rows()[0].len, 4);

        flat.add(&row![7i64, None::<&str>, None::<f64>, None::<i32>])?;
        assert_eq!(flat.rows()[1].len, 4 + 8);
        Ok(())
    }

    #[test]
    fn test_rollback_once() -> Result<()> {
        let mut flat = buffer()?;
        let first = row![1i64, "a", 1.0f64, vec!["t"]];
        flat.add(&first)?;
        flat.add(&row![2i64, "bbbb", 2.0f64, vec!["u", "v"]])?;

        assert_eq!(flat.rollback(), 1 + 8 + 1 + 8 + 1 + 8 + 1 + 8);
        assert_eq!(flat.rollback(), 0);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.crow(0)?, first);

        // Arena cursors went back too: the next row lands where row 1 was
        let offset = flat.add(&row![3i64, "c", 3.0f64, vec!["w"]])?;
        assert_eq!(offset, flat.rows()[0].len);
        assert_eq!(flat.crow(1)?, row![3i64, "c", 3.0f64, vec!["w"]]);
        Ok(())
    }

    #[test]
    fn test_transaction_api() -> Result<()> {
        let mut flat = buffer()?;
        assert!(flat.commit_row().is_err());
        assert!(flat.abandon_row().is_err());

        flat.begin_row()?;
        assert!(flat.begin_row().is_err());
        assert!(flat.add(&row![1i64, "a", 1.0f64, vec!["t"]]).is_err());
        flat.abandon_row()?;
        assert!(flat.is_empty());
        assert_eq!(flat.rollback(), 0);
        Ok(())
    }

    #[test]
    fn test_out_of_range_rows() -> Result<()> {
        let flat = buffer()?;
        assert!(matches!(flat.row(0), Err(Error::ContractViolation(_))));
        assert!(matches!(flat.crow(3), Err(Error::ContractViolation(_))));
        Ok(())
    }

    #[test]
    fn test_hash_equal_null_discrimination() -> Result<()> {
        let mut flat = buffer()?;
        flat.add(&row![0i64, "k", 1.0f64, vec!["a"]])?;
        flat.add(&row![None::<i64>, "k", 1.0f64, vec!["a"]])?;
        flat.add(&row![0i64, "k", 1.0f64, vec!["a"]])?;

        let keys = [0, 1, 3];
        assert!(!flat.equal(0, 1, &keys)?);
        assert!(flat.equal(0, 2, &keys)?);
        assert_eq!(flat.hash(0, &keys)?, flat.hash(2, &keys)?);
        assert_ne!(flat.hash(0, &keys)?, flat.hash(1, &keys)?);
        assert!(flat.hash(0, &[9]).is_err());
        Ok(())
    }

    #[test]
    fn test_primitive_hash_matches_packed_bytes() -> Result<()> {
        let schema = Schema::new(vec![
            Column::new("a", Kind::Integer),
            Column::new("b", Kind::Double),
        ]);
        let fields = Fields::plain(&schema);
        let mut flat = FlatBuffer::new(&Pool::new(), schema, fields)?;
        flat.add(&row![5i32, None::<f64>])?;

        let range = flat.key_range(0, 0, 1)?;
        assert_eq!(range, 0..6);
        assert_eq!(flat.hash(0, &[0, 1])?, flat.hash_range(range));
        Ok(())
    }

    #[test]
    fn test_copy_callback() -> Result<()> {
        let schema = Schema::new(vec![
            Column::new("key", Kind::Integer),
            Column::new("total", Kind::BigInt),
            Column::new("label", Kind::Varchar),
        ]);
        let fields = Fields::plain(&schema);
        let mut flat = FlatBuffer::new(&Pool::new(), schema, fields)?;
        flat.add(&row![1i32, 5i64, "a"])?;
        flat.add(&row![1i32, 7i64, "b"])?;

        flat.copy(1, 0, &[1], |col, kind, old, new| {
            assert_eq!((col, kind), (1, Kind::BigInt));
            let sum = old.and_then(Value::as_i64).unwrap_or(0) + new.and_then(Value::as_i64).unwrap_or(0);
            Some(Value::BigInt(sum))
        })?;
        assert_eq!(flat.stored_value(0, 1)?, Value::BigInt(12));

        let err = flat.copy(1, 0, &[2], |_, _, _, new| new.cloned());
        assert!(matches!(err, Err(Error::ContractViolation(_))));
        let err = flat.copy(1, 0, &[1], |_, _, _, _| Some(Value::Integer(1)));
        assert!(matches!(err, Err(Error::ContractViolation(_))));
        Ok(())
    }

    #[test]
    fn test_sketch_reads_back_finalized() -> Result<()> {
        let schema = Schema::new(vec![
            Column::new("key", Kind::Integer),
            Column::new("total", Kind::BigInt),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::Integer),
            Field::aggregate(builtin::sum(Kind::BigInt)?),
        ]);
        let mut flat = FlatBuffer::new(&Pool::new(), schema, fields)?;
        flat.add(&row![1i32, 5i64])?;

        let spec = builtin::sum(Kind::BigInt)?;
        let mut sketch = spec.build();
        sketch.merge(&Value::BigInt(40));
        sketch.merge(&Value::BigInt(2));
        assert!(flat.attach_sketch(0, 1, sketch)?.is_none());
        assert!(flat.attach_sketch(0, 0, spec.build()).is_err());

        assert_eq!(flat.crow(0)?, row![1i32, 42i64]);
        assert_eq!(flat.row(0)?.read_long(1), 42);
        assert_eq!(flat.stored_value(0, 1)?, Value::BigInt(5));

        assert!(flat.take_sketch(0, 1)?.is_some());
        assert_eq!(flat.crow(0)?, row![1i32, 5i64]);
        Ok(())
    }

    #[test]
    fn test_merge_sketches_over_several_columns() -> Result<()> {
        let schema = Schema::new(vec![
            Column::new("key", Kind::Integer),
            Column::new("a", Kind::BigInt),
            Column::new("b", Kind::BigInt),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::Integer),
            Field::aggregate(builtin::sum(Kind::BigInt)?),
            Field::aggregate(builtin::sum(Kind::BigInt)?),
        ]);
        let mut flat = FlatBuffer::new(&Pool::new(), schema, fields)?;
        flat.add(&row![1i32, 10i64, 100i64])?;
        flat.add(&row![1i32, 5i64, None::<i64>])?;

        let spec = builtin::sum(Kind::BigInt)?;
        flat.attach_sketch(0, 1, spec.build())?;
        flat.attach_sketch(0, 2, spec.build())?;
        flat.merge_sketches(0, 0, &[1, 2])?;
        flat.merge_sketches(1, 0, &[1, 2])?;
        assert_eq!(flat.crow(0)?, row![1i32, 15i64, 100i64]);

        // raw view skips the sketches
        assert_eq!(flat.raw_row(0)?.to_owned_row(), row![1i32, 10i64, 100i64]);

        assert!(flat.merge_sketches(0, 1, &[1]).is_err());
        assert!(flat.merge_sketches(0, 0, &[0]).is_err());
        Ok(())
    }

    #[test]
    fn test_clear_and_memory_usage() -> Result<()> {
        let pool = Pool::new();
        let (schema, fields) = people();
        let mut flat = FlatBuffer::new(&pool, schema, fields)?;
        for i in 0..100i64 {
            flat.add(&row![i, "name", i as f64, vec!["t"]])?;
        }
        assert!(flat.memory_usage() > 0);
        assert_eq!(flat.iter().count(), 100);

        flat.clear();
        assert!(flat.is_empty());
        assert_eq!(flat.add(&row![1i64, "a", 1.0f64, vec!["t"]])?, 0);
        drop(flat);
        assert_eq!(pool.stats().live, 0);
        Ok(())
    }
}
