//! Row properties and borrowed row accessors

use super::arena::{Arena, Arenas};
use super::buffer::FlatBuffer;
use super::codec::{list_items, string_at, ColumnCodec, ScalarCodec};
use super::layout::{decode_flag, FlatLayout};
use crate::error::{Error, Result};
use crate::types::row::{value_bool, value_f64, value_i128};
use crate::types::{Kind, ListData, OwnedRow, RowData, Value, ValueList};
use smallvec::SmallVec;
use std::fmt;

/// Location of a committed row in "main"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub offset: usize,
    pub len: usize,
}

impl RowSpan {
    /// One past the last byte; None when the span overflows
    #[inline]
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.len)
    }
}

/// Per-column state of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnProps {
    pub kind: Kind,
    pub null: bool,
    /// Position of the inline value (one past the flag byte)
    pub offset: usize,
    /// Inline bytes; 0 when null
    pub len: usize,
}

impl ColumnProps {
    /// Position of the flag byte
    #[inline]
    pub fn flag_offset(&self) -> usize {
        self.offset - 1
    }

    /// One past the last inline byte
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Row offset plus per-column properties, recovered from the flag bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowProps {
    pub span: RowSpan,
    pub columns: SmallVec<[ColumnProps; 8]>,
}

impl RowProps {
    /// Walk the flag bytes of `span` in schema order
    pub(crate) fn scan(layout: &FlatLayout, main: &Arena, span: RowSpan) -> Result<Self> {
        let end = span.end().ok_or_else(|| {
            Error::Corrupted(format!("Row span {:?} overflows", span))
        })?;
        let mut pos = span.offset;
        let mut columns = SmallVec::with_capacity(layout.len());

        for column in layout.columns() {
            if pos >= end {
                return Err(Error::Corrupted(format!(
                    "Row at {} ends before column '{}'",
                    span.offset, column.name
                )));
            }
            let (kind, null) = decode_flag(main.read::<u8>(pos))?;
            if kind != column.kind {
                return Err(Error::Corrupted(format!(
                    "Column '{}' flagged as {}, expected {}",
                    column.name, kind, column.kind
                )));
            }
            pos += 1;
            let len = if null { 0 } else { column.width };
            if pos + len > end {
                return Err(Error::Corrupted(format!(
                    "Column '{}' overruns row at {}",
                    column.name, span.offset
                )));
            }
            columns.push(ColumnProps {
                kind,
                null,
                offset: pos,
                len,
            });
            pos += len;
        }

        if pos != end {
            return Err(Error::Corrupted(format!(
                "Row at {} has {} trailing bytes",
                span.offset,
                end - pos
            )));
        }
        Ok(Self { span, columns })
    }

    #[inline]
    pub fn column(&self, col: usize) -> &ColumnProps {
        &self.columns[col]
    }
}

/// Borrowed view of one stored row
///
/// Aggregate columns with an attached sketch read back as the sketch's
/// finalized value; every other column decodes straight from the arenas.
pub struct FlatRow<'a> {
    buffer: &'a FlatBuffer,
    id: usize,
    props: RowProps,
    finals: SmallVec<[(usize, Value); 2]>,
}

impl<'a> FlatRow<'a> {
    pub(crate) fn new(buffer: &'a FlatBuffer, id: usize, props: RowProps) -> Self {
        let finals = buffer.finalized(id);
        Self {
            buffer,
            id,
            props,
            finals,
        }
    }

    /// View without finalized sketch values
    pub(crate) fn raw(buffer: &'a FlatBuffer, id: usize, props: RowProps) -> Self {
        Self {
            buffer,
            id,
            props,
            finals: SmallVec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn props(&self) -> &RowProps {
        &self.props
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.props.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.columns.is_empty()
    }

    pub fn kind(&self, col: usize) -> Kind {
        self.props.columns[col].kind
    }

    fn finalized(&self, col: usize) -> Option<&Value> {
        self.finals.iter().find(|(c, _)| *c == col).map(|(_, v)| v)
    }

    /// Column value, finalized for aggregate columns
    pub fn value(&self, col: usize) -> Value {
        match self.finalized(col) {
            Some(value) => value.clone(),
            None => self.stored(col),
        }
    }

    /// Column value as written, ignoring any sketch
    pub fn stored(&self, col: usize) -> Value {
        self.buffer.decode(col, &self.props.columns[col])
    }

    /// Materialize into an independent row
    pub fn to_owned_row(&self) -> OwnedRow {
        OwnedRow::new((0..self.len()).map(|col| self.value(col)).collect())
    }

    fn arenas(&self) -> &'a Arenas {
        self.buffer.arenas()
    }
}

impl fmt::Debug for FlatRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatRow")
            .field("id", &self.id)
            .field("span", &self.props.span)
            .field("finals", &self.finals)
            .finish()
    }
}

impl RowData for FlatRow<'_> {
    fn is_null(&self, col: usize) -> bool {
        match self.finalized(col) {
            Some(value) => value.is_null(),
            None => self.props.columns[col].null,
        }
    }

    fn read_bool(&self, col: usize) -> bool {
        value_bool(&self.value(col))
    }

    fn read_byte(&self, col: usize) -> i8 {
        value_i128(&self.value(col)) as i8
    }

    fn read_short(&self, col: usize) -> i16 {
        value_i128(&self.value(col)) as i16
    }

    fn read_int(&self, col: usize) -> i32 {
        value_i128(&self.value(col)) as i32
    }

    fn read_long(&self, col: usize) -> i64 {
        value_i128(&self.value(col)) as i64
    }

    fn read_int128(&self, col: usize) -> i128 {
        value_i128(&self.value(col))
    }

    fn read_float(&self, col: usize) -> f32 {
        value_f64(&self.value(col)) as f32
    }

    fn read_double(&self, col: usize) -> f64 {
        value_f64(&self.value(col))
    }

    fn read_string(&self, col: usize) -> &[u8] {
        if let Some(value) = self.finalized(col) {
            return value.as_str().map(str::as_bytes).unwrap_or(&[]);
        }
        let props = &self.props.columns[col];
        if props.null || props.kind != Kind::Varchar {
            return &[];
        }
        let arenas = self.arenas();
        string_at(&arenas.main, &arenas.data, props.offset)
    }

    fn read_list(&self, col: usize) -> Box<dyn ListData + '_> {
        if let Some(value) = self.finalized(col) {
            return Box::new(ValueList::new(value.as_array().unwrap_or(&[])));
        }
        let props = &self.props.columns[col];
        match self.buffer.codec(col) {
            ColumnCodec::Array(item) if !props.null => {
                Box::new(FlatList::new(self.arenas(), *item, props.offset))
            }
            _ => Box::new(ValueList::new(&[])),
        }
    }
}

/// Borrowed view of one ARRAY value
pub struct FlatList<'a> {
    item: ScalarCodec,
    list: &'a Arena,
    data: &'a Arena,
    items: SmallVec<[(bool, usize); 8]>,
}

impl<'a> FlatList<'a> {
    /// List referenced by the inline value at `pos` of "main"
    pub(crate) fn new(arenas: &'a Arenas, item: ScalarCodec, pos: usize) -> Self {
        let count = arenas.main.read::<u32>(pos) as usize;
        let offset = arenas.main.read::<u32>(pos + 4) as usize;
        Self {
            item,
            list: &arenas.list,
            data: &arenas.data,
            items: list_items(&arenas.list, offset, count, item.width),
        }
    }

    /// Item kind
    pub fn kind(&self) -> Kind {
        self.item.kind
    }

    fn item_value(&self, idx: usize) -> Value {
        let (null, pos) = self.items[idx];
        if null {
            Value::Null
        } else {
            (self.item.read)(self.list, self.data, pos)
        }
    }
}

impl ListData for FlatList<'_> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_null(&self, idx: usize) -> bool {
        self.items[idx].0
    }

    fn read_bool(&self, idx: usize) -> bool {
        value_bool(&self.item_value(idx))
    }

    fn read_byte(&self, idx: usize) -> i8 {
        value_i128(&self.item_value(idx)) as i8
    }

    fn read_short(&self, idx: usize) -> i16 {
        value_i128(&self.item_value(idx)) as i16
    }

    fn read_int(&self, idx: usize) -> i32 {
        value_i128(&self.item_value(idx)) as i32
    }

    fn read_long(&self, idx: usize) -> i64 {
        value_i128(&self.item_value(idx)) as i64
    }

    fn read_int128(&self, idx: usize) -> i128 {
        value_i128(&self.item_value(idx))
    }

    fn read_float(&self, idx: usize) -> f32 {
        value_f64(&self.item_value(idx)) as f32
    }

    fn read_double(&self, idx: usize) -> f64 {
        value_f64(&self.item_value(idx))
    }

    fn read_string(&self, idx: usize) -> &[u8] {
        let (null, pos) = self.items[idx];
        if null || self.item.kind != Kind::Varchar {
            return &[];
        }
        string_at(self.list, self.data, pos)
    }
}
