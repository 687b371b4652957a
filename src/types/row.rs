//! Row input contract
//!
//! [`RowData`] is how evaluated rows reach a FlatBuffer: positional,
//! kind-specific reads. The reader chosen for each column is fixed when the
//! buffer is built, so an implementation is only ever asked for the kind its
//! schema declares.

use super::value::Value;

/// Items of one ARRAY value
pub trait ListData {
    /// Number of items
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_null(&self, idx: usize) -> bool;
    fn read_bool(&self, idx: usize) -> bool;
    fn read_byte(&self, idx: usize) -> i8;
    fn read_short(&self, idx: usize) -> i16;
    fn read_int(&self, idx: usize) -> i32;
    fn read_long(&self, idx: usize) -> i64;
    fn read_int128(&self, idx: usize) -> i128;
    fn read_float(&self, idx: usize) -> f32;
    fn read_double(&self, idx: usize) -> f64;
    fn read_string(&self, idx: usize) -> &[u8];
}

/// Positional row reader
pub trait RowData {
    fn is_null(&self, col: usize) -> bool;
    fn read_bool(&self, col: usize) -> bool;
    fn read_byte(&self, col: usize) -> i8;
    fn read_short(&self, col: usize) -> i16;
    fn read_int(&self, col: usize) -> i32;
    fn read_long(&self, col: usize) -> i64;
    fn read_int128(&self, col: usize) -> i128;
    fn read_float(&self, col: usize) -> f32;
    fn read_double(&self, col: usize) -> f64;
    fn read_string(&self, col: usize) -> &[u8];
    fn read_list(&self, col: usize) -> Box<dyn ListData + '_>;
}

// Lenient accessors shared by the Value-backed readers. A value of another
// kind reads as zero; numeric values convert with `as` semantics.
pub(crate) fn value_bool(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

pub(crate) fn value_i128(value: &Value) -> i128 {
    match value {
        Value::Real(v) => *v as i128,
        Value::Double(v) => *v as i128,
        Value::Boolean(b) => *b as i128,
        other => other.as_i128().unwrap_or(0),
    }
}

pub(crate) fn value_f64(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

fn value_bytes(value: &Value) -> &[u8] {
    value.as_bytes().unwrap_or(&[])
}

/// List view over materialized values
#[derive(Debug, Clone, Copy)]
pub struct ValueList<'a> {
    items: &'a [Value],
}

impl<'a> ValueList<'a> {
    pub fn new(items: &'a [Value]) -> Self {
        Self { items }
    }
}

impl ListData for ValueList<'_> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_null(&self, idx: usize) -> bool {
        self.items[idx].is_null()
    }

    fn read_bool(&self, idx: usize) -> bool {
        value_bool(&self.items[idx])
    }

    fn read_byte(&self, idx: usize) -> i8 {
        value_i128(&self.items[idx]) as i8
    }

    fn read_short(&self, idx: usize) -> i16 {
        value_i128(&self.items[idx]) as i16
    }

    fn read_int(&self, idx: usize) -> i32 {
        value_i128(&self.items[idx]) as i32
    }

    fn read_long(&self, idx: usize) -> i64 {
        value_i128(&self.items[idx]) as i64
    }

    fn read_int128(&self, idx: usize) -> i128 {
        value_i128(&self.items[idx])
    }

    fn read_float(&self, idx: usize) -> f32 {
        value_f64(&self.items[idx]) as f32
    }

    fn read_double(&self, idx: usize) -> f64 {
        value_f64(&self.items[idx])
    }

    fn read_string(&self, idx: usize) -> &[u8] {
        value_bytes(&self.items[idx])
    }
}

/// A materialized row that owns its values
///
/// Used both as input to `add`/`update` and as the result of `crow`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedRow {
    values: Vec<Value>,
}

impl OwnedRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, col: usize) -> Option<&Value> {
        self.values.get(col)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for OwnedRow {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl std::ops::Index<usize> for OwnedRow {
    type Output = Value;

    fn index(&self, col: usize) -> &Value {
        &self.values[col]
    }
}

impl RowData for OwnedRow {
    fn is_null(&self, col: usize) -> bool {
        self.values[col].is_null()
    }

    fn read_bool(&self, col: usize) -> bool {
        value_bool(&self.values[col])
    }

    fn read_byte(&self, col: usize) -> i8 {
        value_i128(&self.values[col]) as i8
    }

    fn read_short(&self, col: usize) -> i16 {
        value_i128(&self.values[col]) as i16
    }

    fn read_int(&self, col: usize) -> i32 {
        value_i128(&self.values[col]) as i32
    }

    fn read_long(&self, col: usize) -> i64 {
        value_i128(&self.values[col]) as i64
    }

    fn read_int128(&self, col: usize) -> i128 {
        value_i128(&self.values[col])
    }

    fn read_float(&self, col: usize) -> f32 {
        value_f64(&self.values[col]) as f32
    }

    fn read_double(&self, col: usize) -> f64 {
        value_f64(&self.values[col])
    }

    fn read_string(&self, col: usize) -> &[u8] {
        value_bytes(&self.values[col])
    }

    fn read_list(&self, col: usize) -> Box<dyn ListData + '_> {
        let items = self.values[col].as_array().unwrap_or(&[]);
        Box::new(ValueList::new(items))
    }
}

/// Build an [`OwnedRow`] from anything convertible to [`Value`]
///
/// ```rust,ignore
/// let row = row![1i64, "north", None::<f64>];
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::types::OwnedRow::new(vec![$($crate::types::Value::from($value)),*])
    };
}
