//! Schema and compiled field descriptors

use super::kind::Kind;
use crate::aggregate::AggregateSpec;
use crate::error::{Error, Result};
use std::ops::Index;

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: Kind,
    /// Item kind for ARRAY columns
    pub item: Option<Kind>,
}

impl Column {
    /// Scalar or VARCHAR column
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            item: None,
        }
    }

    /// One-level ARRAY column
    pub fn array(name: impl Into<String>, item: Kind) -> Self {
        Self {
            name: name.into(),
            kind: Kind::Array,
            item: Some(item),
        }
    }
}

/// Ordered column list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Number of columns
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index
    #[inline]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get column index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl Index<usize> for Schema {
    type Output = Column;

    fn index(&self, index: usize) -> &Column {
        &self.columns[index]
    }
}

/// Compiled column descriptor
///
/// A plain field is a grouping key (or simply a stored value in a plain
/// FlatBuffer); an aggregate field carries the spec that builds its sketch.
#[derive(Debug, Clone)]
pub struct Field {
    kind: Kind,
    aggregate: Option<AggregateSpec>,
}

impl Field {
    pub fn plain(kind: Kind) -> Self {
        Self {
            kind,
            aggregate: None,
        }
    }

    /// Aggregate field; its stored kind is the aggregator's input kind
    pub fn aggregate(spec: AggregateSpec) -> Self {
        Self {
            kind: spec.input,
            aggregate: Some(spec),
        }
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    pub fn spec(&self) -> Option<&AggregateSpec> {
        self.aggregate.as_ref()
    }

    /// (input, output) kinds of an aggregate field
    pub fn kinds(&self) -> Option<(Kind, Kind)> {
        self.aggregate.as_ref().map(|s| (s.input, s.output))
    }
}

/// Ordered field list parallel to a [`Schema`]
#[derive(Debug, Clone, Default)]
pub struct Fields {
    fields: Vec<Field>,
}

impl Fields {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Plain fields mirroring every column of `schema`
    pub fn plain(schema: &Schema) -> Self {
        Self {
            fields: schema.columns().iter().map(|c| Field::plain(c.kind)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Check that these fields describe `schema`
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if self.fields.len() != schema.len() {
            return Err(Error::ContractViolation(format!(
                "{} fields for {} columns",
                self.fields.len(),
                schema.len()
            )));
        }
        for (field, column) in self.fields.iter().zip(schema.columns()) {
            if field.kind != column.kind {
                return Err(Error::ContractViolation(format!(
                    "Field kind {} does not match column '{}' of kind {}",
                    field.kind, column.name, column.kind
                )));
            }
        }
        Ok(())
    }
}

impl Index<usize> for Fields {
    type Output = Field;

    fn index(&self, index: usize) -> &Field {
        &self.fields[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", Kind::BigInt),
            Column::new("name", Kind::Varchar),
            Column::array("tags", Kind::Varchar),
        ])
    }

    #[test]
    fn test_schema_lookup() {
        let schema = schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
        assert_eq!(schema[2].item, Some(Kind::Varchar));
    }

    #[test]
    fn test_plain_fields_validate() -> Result<()> {
        let schema = schema();
        let fields = Fields::plain(&schema);
        fields.validate(&schema)?;
        assert!(fields.iter().all(|f| !f.is_aggregate()));
        Ok(())
    }

    #[test]
    fn test_mismatched_fields_rejected() {
        let schema = schema();
        let fields = Fields::new(vec![Field::plain(Kind::BigInt)]);
        assert!(fields.validate(&schema).is_err());

        let fields = Fields::new(vec![
            Field::plain(Kind::Integer),
            Field::plain(Kind::Varchar),
            Field::plain(Kind::Array),
        ]);
        assert!(fields.validate(&schema).is_err());
    }
}
