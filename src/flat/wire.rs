//! Binary image of a FlatBuffer
//!
//! ```text
//! "PFLT" u8:version u32:columns (u8:kind u8:item)*
//! u64:rows u64:main u64:data u64:list
//! (u64:offset u64:len)*rows
//! main bytes | data bytes | list bytes
//! ```
//!
//! All integers are little-endian. Sketches are not part of the image; see
//! `HashFlat::serialize_sketches`.

use super::arena::Arena;
use super::buffer::FlatBuffer;
use super::codec::ColumnCodec;
use super::layout::decode_flag;
use super::row::RowSpan;
use crate::config::SliceConfig;
use crate::error::{Error, Result};
use crate::memory::{Pool, Scalar};
use crate::types::{Fields, Kind, Schema};
use std::sync::Arc;
use tracing::debug;

const MAGIC: &[u8; 4] = b"PFLT";
const VERSION: u8 = 1;

fn put<T: Scalar>(out: &mut Vec<u8>, value: T) {
    let start = out.len();
    out.resize(start + T::WIDTH, 0);
    value.encode(&mut out[start..]);
}

/// Bounds-checked reader over an image
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::Corrupted(format!(
                    "Image truncated: need {} bytes at {}, have {}",
                    len,
                    self.pos,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn get<T: Scalar>(&mut self) -> Result<T> {
        Ok(T::decode(self.take(T::WIDTH)?))
    }

    fn length(&mut self) -> Result<usize> {
        let value = self.get::<u64>()?;
        usize::try_from(value).map_err(|_| Error::Corrupted(format!("Length {} too large", value)))
    }
}

fn check_ref(inline: &Arena, pos: usize, limit: usize, what: &str) -> Result<()> {
    let offset = inline.read::<u32>(pos) as usize;
    let len = inline.read::<u32>(pos + 4) as usize;
    if offset + len > limit {
        return Err(Error::Corrupted(format!(
            "{} reference {}+{} beyond {} bytes",
            what, offset, len, limit
        )));
    }
    Ok(())
}

impl FlatBuffer {
    /// Encode the committed rows
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.has_open_row() {
            return Err(Error::ContractViolation(
                "serialize with a row still open".to_string(),
            ));
        }
        let arenas = self.arenas();
        let columns = self.layout().columns();
        let mut out = Vec::with_capacity(
            64 + columns.len() * 2
                + self.len() * 16
                + arenas.main.len()
                + arenas.data.len()
                + arenas.list.len(),
        );

        out.extend_from_slice(MAGIC);
        put(&mut out, VERSION);
        put(&mut out, columns.len() as u32);
        for column in columns {
            put(&mut out, column.kind.tag());
            put(&mut out, column.item.map(Kind::tag).unwrap_or(0));
        }

        put(&mut out, self.len() as u64);
        put(&mut out, arenas.main.len() as u64);
        put(&mut out, arenas.data.len() as u64);
        put(&mut out, arenas.list.len() as u64);
        for span in self.rows() {
            put(&mut out, span.offset as u64);
            put(&mut out, span.len as u64);
        }

        out.extend_from_slice(arenas.main.as_bytes());
        out.extend_from_slice(arenas.data.as_bytes());
        out.extend_from_slice(arenas.list.as_bytes());
        Ok(out)
    }

    /// Rebuild a buffer from [`FlatBuffer::serialize`] output
    pub fn deserialize(pool: &Arc<Pool>, schema: Schema, fields: Fields, bytes: &[u8]) -> Result<Self> {
        Self::deserialize_with_config(pool, schema, fields, bytes, &SliceConfig::default())
    }

    pub fn deserialize_with_config(
        pool: &Arc<Pool>,
        schema: Schema,
        fields: Fields,
        bytes: &[u8],
        config: &SliceConfig,
    ) -> Result<Self> {
        let mut buffer = Self::with_config(pool, schema, fields, config)?;
        let mut reader = Reader::new(bytes);

        if reader.take(4)? != MAGIC {
            return Err(Error::Corrupted("Bad magic".to_string()));
        }
        let version = reader.get::<u8>()?;
        if version != VERSION {
            return Err(Error::Corrupted(format!("Unsupported image version {}", version)));
        }

        let count = reader.get::<u32>()? as usize;
        if count != buffer.layout().len() {
            return Err(Error::Corrupted(format!(
                "Image has {} columns, schema has {}",
                count,
                buffer.layout().len()
            )));
        }
        for column in buffer.layout().columns() {
            let kind = reader.get::<u8>()?;
            let item = reader.get::<u8>()?;
            if kind != column.kind.tag() || item != column.item.map(Kind::tag).unwrap_or(0) {
                return Err(Error::Corrupted(format!(
                    "Column '{}' type does not match image",
                    column.name
                )));
            }
        }

        let rows = reader.length()?;
        let main_len = reader.length()?;
        let data_len = reader.length()?;
        let list_len = reader.length()?;

        let mut spans = Vec::with_capacity(rows.min(bytes.len() / 16));
        let mut expected = 0;
        for _ in 0..rows {
            let span = RowSpan {
                offset: reader.length()?,
                len: reader.length()?,
            };
            expected = match span.end() {
                Some(end) if span.offset == expected && end <= main_len => end,
                _ => {
                    return Err(Error::Corrupted(format!(
                        "Row span {:?} does not follow previous row",
                        span
                    )))
                }
            };
            spans.push(span);
        }
        if expected != main_len {
            return Err(Error::Corrupted(format!(
                "Rows cover {} of {} main bytes",
                expected, main_len
            )));
        }

        let main = reader.take(main_len)?;
        let data = reader.take(data_len)?;
        let list = reader.take(list_len)?;
        if reader.pos != bytes.len() {
            return Err(Error::Corrupted(format!(
                "{} trailing bytes after image",
                bytes.len() - reader.pos
            )));
        }

        buffer.load_parts(main, data, list, spans);
        for id in buffer.iter() {
            buffer.validate_row(id)?;
        }
        debug!(rows, main_len, data_len, list_len, "Deserialized flat buffer");
        Ok(buffer)
    }

    /// Check flag bytes and every data/list reference of row `id`
    fn validate_row(&self, id: usize) -> Result<()> {
        let props = self.props(id)?;
        let arenas = self.arenas();
        for (col, cp) in props.columns.iter().enumerate() {
            if cp.null {
                continue;
            }
            match self.codec(col) {
                ColumnCodec::Scalar(codec) if codec.kind == Kind::Varchar => {
                    check_ref(&arenas.main, cp.offset, arenas.data.len(), "VARCHAR")?;
                }
                ColumnCodec::Scalar(_) => {}
                ColumnCodec::Array(item) => {
                    let count = arenas.main.read::<u32>(cp.offset) as usize;
                    let mut pos = arenas.main.read::<u32>(cp.offset + 4) as usize;
                    for _ in 0..count {
                        if pos >= arenas.list.len() {
                            return Err(Error::Corrupted(format!("List of row {} overruns arena", id)));
                        }
                        let (kind, null) = decode_flag(arenas.list.read::<u8>(pos))?;
                        if kind != item.kind {
                            return Err(Error::Corrupted(format!(
                                "List item flagged as {}, expected {}",
                                kind, item.kind
                            )));
                        }
                        pos += 1;
                        if null {
                            continue;
                        }
                        if pos + item.width > arenas.list.len() {
                            return Err(Error::Corrupted(format!("List of row {} overruns arena", id)));
                        }
                        if item.kind == Kind::Varchar {
                            check_ref(&arenas.list, pos, arenas.data.len(), "VARCHAR item")?;
                        }
                        pos += item.width;
                    }
                }
            }
        }
        Ok(())
    }
}
