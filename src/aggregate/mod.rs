//! Pluggable incremental aggregation
//!
//! FlatBuffer and HashFlat invoke these traits but never implement merge
//! semantics themselves.

pub mod builtin;
pub mod registry;
pub mod sketch;

pub use registry::{AggregateFactory, AggregatorRegistry};
pub use sketch::{downcast, AggregateSpec, Aggregator, MergeProperties, Sketch, Sketcher};
