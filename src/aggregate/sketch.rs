//! Sketch and aggregator traits
//!
//! A [`Sketch`] is per-group aggregation state that can be serialized,
//! reloaded and mixed with another partial state of the same type. An
//! [`Aggregator`] is a sketch that also consumes input values and produces a
//! final output value.
//!
//! Grouping merges rows in arrival order but mixes partial results in
//! whatever order the caller hands them over, so an aggregator used for
//! grouping must declare itself associative and commutative.

use crate::error::{Error, Result};
use crate::types::{Kind, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Serializable, mixable aggregation state
pub trait Sketch: Send + fmt::Debug {
    /// Whether the serialized state fits in `size_hint` bytes
    fn fit(&self, size_hint: usize) -> bool;

    /// Append the serialized state to `buf`; returns bytes written
    fn serialize(&self, buf: &mut Vec<u8>) -> usize;

    /// Replace this state with one read from the front of `buf`; returns
    /// bytes consumed
    fn load(&mut self, buf: &[u8]) -> Result<usize>;

    /// Combine another partial state of the same type into this one
    fn mix(&mut self, other: &dyn Sketch) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Algebraic properties of an aggregator's merge and mix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeProperties {
    pub associative: bool,
    pub commutative: bool,
}

impl MergeProperties {
    /// Associative and commutative
    pub const COMMUTATIVE_MONOID: Self = Self {
        associative: true,
        commutative: true,
    };

    /// Safe to merge in arrival order and mix partials in any order
    pub fn is_order_insensitive(&self) -> bool {
        self.associative && self.commutative
    }
}

/// Incremental aggregation over one column
pub trait Aggregator: Sketch {
    /// Fold one input value into the state
    fn merge(&mut self, value: &Value);

    /// Output value for the current state
    fn finalize(&self) -> Value;

    fn properties(&self) -> MergeProperties {
        MergeProperties::COMMUTATIVE_MONOID
    }

    fn as_sketch(&self) -> &dyn Sketch;
}

/// Factory for fresh aggregator state
pub type Sketcher = Arc<dyn Fn() -> Box<dyn Aggregator> + Send + Sync>;

/// Downcast `other` to the concrete sketch type `T`
pub fn downcast<'a, T: 'static>(other: &'a dyn Sketch, name: &str) -> Result<&'a T> {
    other
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Aggregate(format!("Cannot mix {:?} into {}", other, name)))
}

/// Aggregate definition attached to a [`crate::Field`]
#[derive(Clone)]
pub struct AggregateSpec {
    pub name: String,
    pub input: Kind,
    pub output: Kind,
    pub sketcher: Sketcher,
}

impl AggregateSpec {
    pub fn new(name: impl Into<String>, input: Kind, output: Kind, sketcher: Sketcher) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            sketcher,
        }
    }

    /// Fresh aggregator state
    pub fn build(&self) -> Box<dyn Aggregator> {
        (self.sketcher)()
    }

    /// Reject aggregators whose merge order would change the result
    pub fn validate(&self) -> Result<()> {
        let properties = self.build().properties();
        if !properties.is_order_insensitive() {
            return Err(Error::Aggregate(format!(
                "Aggregator '{}' is not associative and commutative ({:?})",
                self.name, properties
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateSpec")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}
