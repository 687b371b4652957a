//! Aggregator registry - maps aggregate names to spec factories

use super::builtin;
use super::sketch::AggregateSpec;
use crate::error::{Error, Result};
use crate::types::Kind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds the spec for one input kind
pub type AggregateFactory = Arc<dyn Fn(Kind) -> Result<AggregateSpec> + Send + Sync>;

/// Aggregator registry
pub struct AggregatorRegistry {
    factories: RwLock<HashMap<String, AggregateFactory>>,
}

impl AggregatorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registry holding count, sum, min, max and avg
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let builtins: [(&str, fn(Kind) -> Result<AggregateSpec>); 5] = [
            ("count", builtin::count),
            ("sum", builtin::sum),
            ("min", builtin::min),
            ("max", builtin::max),
            ("avg", builtin::avg),
        ];
        {
            let mut factories = registry.factories.write();
            for (name, factory) in builtins {
                factories.insert(name.to_string(), Arc::new(factory));
            }
        }
        registry
    }

    /// Register an aggregate
    pub fn register(&self, name: &str, factory: AggregateFactory) -> Result<()> {
        let mut factories = self.factories.write();

        if factories.contains_key(name) {
            return Err(Error::Aggregate(format!(
                "Aggregate '{}' already registered",
                name
            )));
        }

        factories.insert(name.to_string(), factory);
        debug!(name, "Registered aggregate");
        Ok(())
    }

    /// Unregister an aggregate
    pub fn unregister(&self, name: &str) -> Result<()> {
        self.factories
            .write()
            .remove(name)
            .ok_or_else(|| Error::Aggregate(format!("Aggregate '{}' not found", name)))?;
        Ok(())
    }

    /// Get an aggregate factory
    pub fn get(&self, name: &str) -> Option<AggregateFactory> {
        self.factories.read().get(name).cloned()
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the spec of aggregate `name` specialized for `input`
    pub fn spec(&self, name: &str, input: Kind) -> Result<AggregateSpec> {
        let factory = self
            .get(name)
            .ok_or_else(|| Error::Aggregate(format!("Unknown aggregate: {}", name)))?;
        factory(input)
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
