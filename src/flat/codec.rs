//! Per-kind dispatch tables
//!
//! Every column gets one [`ColumnCodec`] when the buffer is built. The codec
//! holds plain function pointers monomorphized for the column's kind, so the
//! per-row paths never switch on [`Kind`].

use super::arena::{Arena, Arenas};
use super::layout::{encode_flag, NULL_FLAG};
use crate::error::{Error, Result};
use crate::memory::Scalar;
use crate::types::{Kind, ListData, RowData, Value};
use smallvec::SmallVec;

/// Canonical key bytes collected by the generic hash path
pub(crate) type KeyBytes = SmallVec<[u8; 64]>;

/// Write the inline value of a non-null column into "main"
type WriteFn = fn(&dyn RowData, usize, &mut Arenas) -> Result<()>;
/// Write the inline value of a non-null list item into "list"
type ItemWriteFn = fn(&dyn ListData, usize, &mut Arenas) -> Result<()>;
/// Decode the inline value at `pos` of the first arena
type ReadFn = fn(&Arena, &Arena, usize) -> Value;
/// Append the canonical bytes of the inline value at `pos`
type HashFn = fn(&Arena, &Arena, usize, &mut KeyBytes);
/// Compare two inline values of the same arena
type EqualFn = fn(&Arena, &Arena, usize, usize) -> bool;
/// Overwrite a fixed-width inline value; false if not possible
type OverwriteFn = fn(&mut Arena, usize, &Value) -> bool;

/// Fixed-width primitive stored inline
pub(crate) trait Primitive: Scalar {
    fn from_row(row: &dyn RowData, col: usize) -> Self;
    fn from_list(list: &dyn ListData, idx: usize) -> Self;
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! primitive {
    ($ty:ty, $read:ident, $variant:ident) => {
        impl Primitive for $ty {
            #[inline]
            fn from_row(row: &dyn RowData, col: usize) -> Self {
                row.$read(col)
            }

            #[inline]
            fn from_list(list: &dyn ListData, idx: usize) -> Self {
                list.$read(idx)
            }

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

primitive!(bool, read_bool, Boolean);
primitive!(i8, read_byte, TinyInt);
primitive!(i16, read_short, SmallInt);
primitive!(i32, read_int, Integer);
primitive!(i64, read_long, BigInt);
primitive!(i128, read_int128, Int128);
primitive!(f32, read_float, Real);
primitive!(f64, read_double, Double);

fn write_primitive<T: Primitive>(row: &dyn RowData, col: usize, arenas: &mut Arenas) -> Result<()> {
    arenas.main.push(T::from_row(row, col));
    Ok(())
}

fn write_primitive_item<T: Primitive>(
    list: &dyn ListData,
    idx: usize,
    arenas: &mut Arenas,
) -> Result<()> {
    arenas.list.push(T::from_list(list, idx));
    Ok(())
}

fn read_primitive<T: Primitive>(inline: &Arena, _data: &Arena, pos: usize) -> Value {
    inline.read::<T>(pos).into_value()
}

fn hash_primitive<T: Primitive>(inline: &Arena, _data: &Arena, pos: usize, out: &mut KeyBytes) {
    out.extend_from_slice(inline.bytes(pos, T::WIDTH));
}

fn equal_primitive<T: Primitive>(inline: &Arena, _data: &Arena, a: usize, b: usize) -> bool {
    inline.bytes(a, T::WIDTH) == inline.bytes(b, T::WIDTH)
}

fn overwrite_primitive<T: Primitive>(inline: &mut Arena, pos: usize, value: &Value) -> bool {
    match T::from_value(value) {
        Some(v) => {
            inline.overwrite(pos, v);
            true
        }
        None => false,
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::ContractViolation(format!("{} {} exceeds 32-bit reference", what, value)))
}

/// Copy a string into "data"; returns the (offset, length) reference
fn push_string(bytes: &[u8], arenas: &mut Arenas) -> Result<(u32, u32)> {
    let len = to_u32(bytes.len(), "VARCHAR length")?;
    let offset = to_u32(arenas.data.len(), "Data offset")?;
    arenas.data.push_bytes(bytes);
    Ok((offset, len))
}

fn write_varchar(row: &dyn RowData, col: usize, arenas: &mut Arenas) -> Result<()> {
    let (offset, len) = push_string(row.read_string(col), arenas)?;
    arenas.main.push(offset);
    arenas.main.push(len);
    Ok(())
}

fn write_varchar_item(list: &dyn ListData, idx: usize, arenas: &mut Arenas) -> Result<()> {
    let (offset, len) = push_string(list.read_string(idx), arenas)?;
    arenas.list.push(offset);
    arenas.list.push(len);
    Ok(())
}

/// String bytes referenced by the inline value at `pos`
#[inline]
pub(crate) fn string_at<'a>(inline: &Arena, data: &'a Arena, pos: usize) -> &'a [u8] {
    let offset = inline.read::<u32>(pos) as usize;
    let len = inline.read::<u32>(pos + 4) as usize;
    data.bytes(offset, len)
}

fn read_varchar(inline: &Arena, data: &Arena, pos: usize) -> Value {
    Value::from_bytes(string_at(inline, data, pos))
}

fn hash_varchar(inline: &Arena, data: &Arena, pos: usize, out: &mut KeyBytes) {
    let bytes = string_at(inline, data, pos);
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn equal_varchar(inline: &Arena, data: &Arena, a: usize, b: usize) -> bool {
    string_at(inline, data, a) == string_at(inline, data, b)
}

fn overwrite_never(_inline: &mut Arena, _pos: usize, _value: &Value) -> bool {
    false
}

/// Functions for one scalar or VARCHAR kind
#[derive(Clone, Copy)]
pub(crate) struct ScalarCodec {
    pub kind: Kind,
    pub width: usize,
    pub write: WriteFn,
    pub write_item: ItemWriteFn,
    pub read: ReadFn,
    pub hash: HashFn,
    pub equal: EqualFn,
    pub overwrite: OverwriteFn,
}

impl ScalarCodec {
    fn primitive<T: Primitive>(kind: Kind) -> Self {
        Self {
            kind,
            width: T::WIDTH,
            write: write_primitive::<T>,
            write_item: write_primitive_item::<T>,
            read: read_primitive::<T>,
            hash: hash_primitive::<T>,
            equal: equal_primitive::<T>,
            overwrite: overwrite_primitive::<T>,
        }
    }

    fn varchar() -> Self {
        Self {
            kind: Kind::Varchar,
            width: 8,
            write: write_varchar,
            write_item: write_varchar_item,
            read: read_varchar,
            hash: hash_varchar,
            equal: equal_varchar,
            overwrite: overwrite_never,
        }
    }

    /// Select the functions for `kind`
    pub(crate) fn for_kind(kind: Kind) -> Result<Self> {
        Ok(match kind {
            Kind::Boolean => Self::primitive::<bool>(kind),
            Kind::TinyInt => Self::primitive::<i8>(kind),
            Kind::SmallInt => Self::primitive::<i16>(kind),
            Kind::Integer => Self::primitive::<i32>(kind),
            Kind::BigInt => Self::primitive::<i64>(kind),
            Kind::Int128 => Self::primitive::<i128>(kind),
            Kind::Real => Self::primitive::<f32>(kind),
            Kind::Double => Self::primitive::<f64>(kind),
            Kind::Varchar => Self::varchar(),
            Kind::Array | Kind::Map | Kind::Struct => {
                return Err(Error::UnsupportedType(kind.to_string()))
            }
        })
    }
}

/// Positions of the items of one ARRAY value in "list"
///
/// Each entry is (is_null, position of the inline value).
pub(crate) fn list_items(
    list: &Arena,
    offset: usize,
    count: usize,
    width: usize,
) -> SmallVec<[(bool, usize); 8]> {
    let mut items = SmallVec::with_capacity(count);
    let mut pos = offset;
    for _ in 0..count {
        let null = list.read::<u8>(pos) & NULL_FLAG != 0;
        pos += 1;
        items.push((null, pos));
        if !null {
            pos += width;
        }
    }
    items
}

/// Dispatch for one column
#[derive(Clone, Copy)]
pub(crate) enum ColumnCodec {
    Scalar(ScalarCodec),
    /// One-level ARRAY; the codec is the item's
    Array(ScalarCodec),
}

impl ColumnCodec {
    pub(crate) fn new(kind: Kind, item: Option<Kind>) -> Result<Self> {
        match kind {
            Kind::Array => {
                let item = item.ok_or_else(|| Error::UnsupportedType("ARRAY without item type".into()))?;
                Ok(Self::Array(ScalarCodec::for_kind(item)?))
            }
            _ => Ok(Self::Scalar(ScalarCodec::for_kind(kind)?)),
        }
    }

    /// Write the inline value of a non-null column
    pub(crate) fn write(&self, row: &dyn RowData, col: usize, arenas: &mut Arenas) -> Result<()> {
        match self {
            Self::Scalar(codec) => (codec.write)(row, col, arenas),
            Self::Array(item) => {
                let list = row.read_list(col);
                let count = to_u32(list.len(), "ARRAY length")?;
                let offset = to_u32(arenas.list.len(), "List offset")?;
                for idx in 0..list.len() {
                    let null = list.is_null(idx);
                    arenas.list.push(encode_flag(item.kind, null));
                    if !null {
                        (item.write_item)(&*list, idx, arenas)?;
                    }
                }
                arenas.main.push(count);
                arenas.main.push(offset);
                Ok(())
            }
        }
    }

    /// Decode the inline value at `pos` of "main"
    pub(crate) fn read(&self, arenas: &Arenas, pos: usize) -> Value {
        match self {
            Self::Scalar(codec) => (codec.read)(&arenas.main, &arenas.data, pos),
            Self::Array(item) => {
                let count = arenas.main.read::<u32>(pos) as usize;
                let offset = arenas.main.read::<u32>(pos + 4) as usize;
                let values = list_items(&arenas.list, offset, count, item.width)
                    .into_iter()
                    .map(|(null, at)| {
                        if null {
                            Value::Null
                        } else {
                            (item.read)(&arenas.list, &arenas.data, at)
                        }
                    })
                    .collect();
                Value::Array(values)
            }
        }
    }

    /// Append the canonical bytes of the inline value at `pos`
    pub(crate) fn hash(&self, arenas: &Arenas, pos: usize, out: &mut KeyBytes) {
        match self {
            Self::Scalar(codec) => (codec.hash)(&arenas.main, &arenas.data, pos, out),
            Self::Array(item) => {
                let count = arenas.main.read::<u32>(pos) as usize;
                let offset = arenas.main.read::<u32>(pos + 4) as usize;
                out.extend_from_slice(&(count as u32).to_le_bytes());
                for (null, at) in list_items(&arenas.list, offset, count, item.width) {
                    out.push(encode_flag(item.kind, null));
                    if !null {
                        (item.hash)(&arenas.list, &arenas.data, at, out);
                    }
                }
            }
        }
    }

    /// Compare the inline values at `a` and `b` of "main"
    pub(crate) fn equal(&self, arenas: &Arenas, a: usize, b: usize) -> bool {
        match self {
            Self::Scalar(codec) => (codec.equal)(&arenas.main, &arenas.data, a, b),
            Self::Array(item) => {
                let count = arenas.main.read::<u32>(a);
                if count != arenas.main.read::<u32>(b) {
                    return false;
                }
                let left = list_items(
                    &arenas.list,
                    arenas.main.read::<u32>(a + 4) as usize,
                    count as usize,
                    item.width,
                );
                let right = list_items(
                    &arenas.list,
                    arenas.main.read::<u32>(b + 4) as usize,
                    count as usize,
                    item.width,
                );
                left.iter().zip(right.iter()).all(|(&(ln, la), &(rn, ra))| match (ln, rn) {
                    (true, true) => true,
                    (false, false) => (item.equal)(&arenas.list, &arenas.data, la, ra),
                    _ => false,
                })
            }
        }
    }

    /// Overwrite a fixed-width inline value in "main"
    pub(crate) fn overwrite(&self, arenas: &mut Arenas, pos: usize, value: &Value) -> bool {
        match self {
            Self::Scalar(codec) => (codec.overwrite)(&mut arenas.main, pos, value),
            Self::Array(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SliceConfig;
    use crate::memory::Pool;
    use crate::types::OwnedRow;

    #[test]
    fn test_dispatch_selection() {
        assert!(ColumnCodec::new(Kind::BigInt, None).is_ok());
        assert!(ColumnCodec::new(Kind::Array, Some(Kind::Varchar)).is_ok());
        assert!(matches!(
            ColumnCodec::new(Kind::Struct, None),
            Err(Error::UnsupportedType(_))
        ));
        assert!(matches!(
            ColumnCodec::new(Kind::Array, Some(Kind::Map)),
            Err(Error::UnsupportedType(_))
        ));
        assert!(ColumnCodec::new(Kind::Array, None).is_err());
    }

    #[test]
    fn test_array_write_read_hash() -> Result<()> {
        let pool = Pool::new();
        let mut arenas = Arenas::new(&pool, &SliceConfig::default());
        let codec = ColumnCodec::new(Kind::Array, Some(Kind::Varchar))?;
        let row = OwnedRow::new(vec![Value::from(vec![
            Value::from("x"),
            Value::Null,
            Value::from("yz"),
        ])]);

        codec.write(&row, 0, &mut arenas)?;
        codec.write(&row, 0, &mut arenas)?;
        assert_eq!(arenas.main.len(), 16);
        assert_eq!(codec.read(&arenas, 0), row[0]);
        assert!(codec.equal(&arenas, 0, 8));

        let mut a = KeyBytes::new();
        let mut b = KeyBytes::new();
        codec.hash(&arenas, 0, &mut a);
        codec.hash(&arenas, 8, &mut b);
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_overwrite_checks_kind() -> Result<()> {
        let pool = Pool::new();
        let mut arenas = Arenas::new(&pool, &SliceConfig::default());
        let codec = ColumnCodec::new(Kind::Integer, None)?;
        codec.write(&OwnedRow::new(vec![Value::Integer(1)]), 0, &mut arenas)?;

        assert!(codec.overwrite(&mut arenas, 0, &Value::Integer(9)));
        assert!(!codec.overwrite(&mut arenas, 0, &Value::BigInt(9)));
        assert_eq!(codec.read(&arenas, 0), Value::Integer(9));
        Ok(())
    }
}
