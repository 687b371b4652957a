//! Built-in aggregators: count, sum, min, max, avg
//!
//! Each constructor takes the input kind and returns an [`AggregateSpec`]
//! whose output kind and sketch specialization follow from it:
//!
//! | name  | input                | output                      |
//! |-------|----------------------|-----------------------------|
//! | count | any storable         | BIGINT                      |
//! | sum   | integral / floating  | BIGINT (INT128) / DOUBLE    |
//! | min   | primitive or VARCHAR | same as input               |
//! | max   | primitive or VARCHAR | same as input               |
//! | avg   | integral / floating  | DOUBLE                      |
//!
//! Null inputs are skipped by every aggregator.

use super::sketch::{downcast, AggregateSpec, Aggregator, Sketch};
use crate::error::{Error, Result};
use crate::memory::Scalar;
use crate::types::{Kind, Value};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

fn put<T: Scalar>(buf: &mut Vec<u8>, value: T) {
    let start = buf.len();
    buf.resize(start + T::WIDTH, 0);
    value.encode(&mut buf[start..]);
}

fn take<T: Scalar>(buf: &[u8], pos: usize, what: &str) -> Result<T> {
    buf.get(pos..pos + T::WIDTH)
        .map(T::decode)
        .ok_or_else(|| Error::Corrupted(format!("Truncated {} sketch", what)))
}

/// COUNT of non-null inputs
#[derive(Debug, Default, Clone)]
pub struct Count {
    count: i64,
}

impl Count {
    const SIZE: usize = 8;
}

impl Sketch for Count {
    fn fit(&self, size_hint: usize) -> bool {
        size_hint >= Self::SIZE
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> usize {
        put(buf, self.count);
        Self::SIZE
    }

    fn load(&mut self, buf: &[u8]) -> Result<usize> {
        self.count = take(buf, 0, "count")?;
        Ok(Self::SIZE)
    }

    fn mix(&mut self, other: &dyn Sketch) -> Result<()> {
        let other = downcast::<Self>(other, "count")?;
        self.count += other.count;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Aggregator for Count {
    fn merge(&mut self, value: &Value) {
        if !value.is_null() {
            self.count += 1;
        }
    }

    fn finalize(&self) -> Value {
        Value::BigInt(self.count)
    }

    fn as_sketch(&self) -> &dyn Sketch {
        self
    }
}

/// SUM over integral inputs, accumulated in 128 bits
#[derive(Debug, Clone)]
pub struct IntSum {
    sum: i128,
    seen: bool,
    output: Kind,
}

impl IntSum {
    const SIZE: usize = 17;

    pub fn new(output: Kind) -> Self {
        Self {
            sum: 0,
            seen: false,
            output,
        }
    }
}

impl Sketch for IntSum {
    fn fit(&self, size_hint: usize) -> bool {
        size_hint >= Self::SIZE
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> usize {
        put(buf, self.seen);
        put(buf, self.sum);
        Self::SIZE
    }

    fn load(&mut self, buf: &[u8]) -> Result<usize> {
        self.seen = take(buf, 0, "sum")?;
        self.sum = take(buf, 1, "sum")?;
        Ok(Self::SIZE)
    }

    fn mix(&mut self, other: &dyn Sketch) -> Result<()> {
        let other = downcast::<Self>(other, "sum")?;
        self.sum = self.sum.wrapping_add(other.sum);
        self.seen |= other.seen;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Aggregator for IntSum {
    fn merge(&mut self, value: &Value) {
        if let Some(v) = value.as_i128() {
            self.sum = self.sum.wrapping_add(v);
            self.seen = true;
        }
    }

    fn finalize(&self) -> Value {
        if !self.seen {
            return Value::Null;
        }
        match self.output {
            Kind::Int128 => Value::Int128(self.sum),
            _ => Value::BigInt(self.sum as i64),
        }
    }

    fn as_sketch(&self) -> &dyn Sketch {
        self
    }
}

/// SUM over floating inputs
#[derive(Debug, Default, Clone)]
pub struct FloatSum {
    sum: f64,
    seen: bool,
}

impl FloatSum {
    const SIZE: usize = 9;
}

impl Sketch for FloatSum {
    fn fit(&self, size_hint: usize) -> bool {
        size_hint >= Self::SIZE
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> usize {
        put(buf, self.seen);
        put(buf, self.sum);
        Self::SIZE
    }

    fn load(&mut self, buf: &[u8]) -> Result<usize> {
        self.seen = take(buf, 0, "sum")?;
        self.sum = take(buf, 1, "sum")?;
        Ok(Self::SIZE)
    }

    fn mix(&mut self, other: &dyn Sketch) -> Result<()> {
        let other = downcast::<Self>(other, "sum")?;
        self.sum += other.sum;
        self.seen |= other.seen;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Aggregator for FloatSum {
    fn merge(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.sum += v;
            self.seen = true;
        }
    }

    fn finalize(&self) -> Value {
        if self.seen {
            Value::Double(self.sum)
        } else {
            Value::Null
        }
    }

    fn as_sketch(&self) -> &dyn Sketch {
        self
    }
}

/// Order two values of the same kind
///
/// Floats use total ordering so NaN has a fixed place.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::Varchar(_) | Value::Bytes(_), _) => Some(a.as_bytes()?.cmp(b.as_bytes()?)),
        (Value::Real(_) | Value::Double(_), _) | (_, Value::Real(_) | Value::Double(_)) => {
            Some(a.as_f64()?.total_cmp(&b.as_f64()?))
        }
        _ => Some(a.as_i128()?.cmp(&b.as_i128()?)),
    }
}

fn encode_value(value: &Value, buf: &mut Vec<u8>) -> usize {
    let start = buf.len();
    match value {
        Value::Boolean(v) => put(buf, *v),
        Value::TinyInt(v) => put(buf, *v),
        Value::SmallInt(v) => put(buf, *v),
        Value::Integer(v) => put(buf, *v),
        Value::BigInt(v) => put(buf, *v),
        Value::Int128(v) => put(buf, *v),
        Value::Real(v) => put(buf, *v),
        Value::Double(v) => put(buf, *v),
        Value::Varchar(_) | Value::Bytes(_) => {
            let bytes = value.as_bytes().unwrap_or(&[]);
            put(buf, bytes.len() as u32);
            buf.extend_from_slice(bytes);
        }
        Value::Null | Value::Array(_) => {}
    }
    buf.len() - start
}

fn decode_value(kind: Kind, buf: &[u8]) -> Result<(Value, usize)> {
    const WHAT: &str = "min/max";
    let value = match kind {
        Kind::Boolean => Value::Boolean(take(buf, 0, WHAT)?),
        Kind::TinyInt => Value::TinyInt(take(buf, 0, WHAT)?),
        Kind::SmallInt => Value::SmallInt(take(buf, 0, WHAT)?),
        Kind::Integer => Value::Integer(take(buf, 0, WHAT)?),
        Kind::BigInt => Value::BigInt(take(buf, 0, WHAT)?),
        Kind::Int128 => Value::Int128(take(buf, 0, WHAT)?),
        Kind::Real => Value::Real(take(buf, 0, WHAT)?),
        Kind::Double => Value::Double(take(buf, 0, WHAT)?),
        Kind::Varchar => {
            let len = take::<u32>(buf, 0, WHAT)? as usize;
            let bytes = buf
                .get(4..4 + len)
                .ok_or_else(|| Error::Corrupted("Truncated min/max sketch".to_string()))?;
            return Ok((Value::from_bytes(bytes), 4 + len));
        }
        other => return Err(Error::UnsupportedType(other.to_string())),
    };
    Ok((value, kind.width()?))
}

/// MIN or MAX, keeping the value that orders as `keep` against the current one
#[derive(Debug, Clone)]
pub struct Extreme {
    kind: Kind,
    keep: Ordering,
    best: Option<Value>,
}

impl Extreme {
    pub fn min(kind: Kind) -> Self {
        Self {
            kind,
            keep: Ordering::Less,
            best: None,
        }
    }

    pub fn max(kind: Kind) -> Self {
        Self {
            kind,
            keep: Ordering::Greater,
            best: None,
        }
    }

    fn encoded_len(&self) -> usize {
        match &self.best {
            None => 1,
            Some(value @ (Value::Varchar(_) | Value::Bytes(_))) => {
                1 + 4 + value.as_bytes().map_or(0, <[u8]>::len)
            }
            Some(_) => 1 + self.kind.width().unwrap_or(0),
        }
    }
}

impl Sketch for Extreme {
    fn fit(&self, size_hint: usize) -> bool {
        size_hint >= self.encoded_len()
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> usize {
        put(buf, self.best.is_some());
        match &self.best {
            Some(value) => 1 + encode_value(value, buf),
            None => 1,
        }
    }

    fn load(&mut self, buf: &[u8]) -> Result<usize> {
        if !take::<bool>(buf, 0, "min/max")? {
            self.best = None;
            return Ok(1);
        }
        let (value, len) = decode_value(self.kind, &buf[1..])?;
        self.best = Some(value);
        Ok(1 + len)
    }

    fn mix(&mut self, other: &dyn Sketch) -> Result<()> {
        let other = downcast::<Self>(other, "min/max")?;
        if other.kind != self.kind || other.keep != self.keep {
            return Err(Error::Aggregate(format!(
                "Cannot mix {:?} into {:?}",
                other, self
            )));
        }
        if let Some(value) = &other.best {
            self.merge(value);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Aggregator for Extreme {
    fn merge(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        let replace = match &self.best {
            None => true,
            Some(best) => compare_values(value, best) == Some(self.keep),
        };
        if replace {
            self.best = Some(value.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.best.clone().unwrap_or(Value::Null)
    }

    fn as_sketch(&self) -> &dyn Sketch {
        self
    }
}

/// AVG over numeric inputs
#[derive(Debug, Default, Clone)]
pub struct Avg {
    sum: f64,
    count: i64,
}

impl Avg {
    const SIZE: usize = 16;
}

impl Sketch for Avg {
    fn fit(&self, size_hint: usize) -> bool {
        size_hint >= Self::SIZE
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> usize {
        put(buf, self.sum);
        put(buf, self.count);
        Self::SIZE
    }

    fn load(&mut self, buf: &[u8]) -> Result<usize> {
        self.sum = take(buf, 0, "avg")?;
        self.count = take(buf, 8, "avg")?;
        Ok(Self::SIZE)
    }

    fn mix(&mut self, other: &dyn Sketch) -> Result<()> {
        let other = downcast::<Self>(other, "avg")?;
        self.sum += other.sum;
        self.count += other.count;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Aggregator for Avg {
    fn merge(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.sum += v;
            self.count += 1;
        }
    }

    fn finalize(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Double(self.sum / self.count as f64)
        }
    }

    fn as_sketch(&self) -> &dyn Sketch {
        self
    }
}

fn reject(name: &str, input: Kind) -> Error {
    Error::Aggregate(format!("{} does not accept {} input", name, input))
}

/// COUNT over any storable kind
pub fn count(input: Kind) -> Result<AggregateSpec> {
    input.width()?;
    Ok(AggregateSpec::new(
        "count",
        input,
        Kind::BigInt,
        Arc::new(|| Box::new(Count::default()) as Box<dyn Aggregator>),
    ))
}

/// SUM over integral or floating input
pub fn sum(input: Kind) -> Result<AggregateSpec> {
    if input.is_integral() {
        let output = if input == Kind::Int128 {
            Kind::Int128
        } else {
            Kind::BigInt
        };
        Ok(AggregateSpec::new(
            "sum",
            input,
            output,
            Arc::new(move || Box::new(IntSum::new(output)) as Box<dyn Aggregator>),
        ))
    } else if input.is_floating() {
        Ok(AggregateSpec::new(
            "sum",
            input,
            Kind::Double,
            Arc::new(|| Box::new(FloatSum::default()) as Box<dyn Aggregator>),
        ))
    } else {
        Err(reject("sum", input))
    }
}

fn orderable(input: Kind) -> bool {
    input.is_primitive() || input == Kind::Varchar
}

/// MIN over primitive or VARCHAR input
pub fn min(input: Kind) -> Result<AggregateSpec> {
    if !orderable(input) {
        return Err(reject("min", input));
    }
    Ok(AggregateSpec::new(
        "min",
        input,
        input,
        Arc::new(move || Box::new(Extreme::min(input)) as Box<dyn Aggregator>),
    ))
}

/// MAX over primitive or VARCHAR input
pub fn max(input: Kind) -> Result<AggregateSpec> {
    if !orderable(input) {
        return Err(reject("max", input));
    }
    Ok(AggregateSpec::new(
        "max",
        input,
        input,
        Arc::new(move || Box::new(Extreme::max(input)) as Box<dyn Aggregator>),
    ))
}

/// AVG over integral or floating input
pub fn avg(input: Kind) -> Result<AggregateSpec> {
    if !(input.is_integral() || input.is_floating()) {
        return Err(reject("avg", input));
    }
    Ok(AggregateSpec::new(
        "avg",
        input,
        Kind::Double,
        Arc::new(|| Box::new(Avg::default()) as Box<dyn Aggregator>),
    ))
}
