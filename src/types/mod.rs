//! Column types, values and the row input contract
//!
//! # Supported Types
//!
//! - **Scalars**: BOOLEAN, TINYINT, SMALLINT, INTEGER, BIGINT, INT128, REAL, DOUBLE
//! - **VARCHAR**: UTF-8 bytes stored out of line
//! - **ARRAY**: one level, items of any scalar kind or VARCHAR
//!
//! MAP and STRUCT exist as tags only; any attempt to store them fails with
//! [`crate::error::Error::UnsupportedType`].

pub mod kind;
pub mod row;
pub mod schema;
pub mod value;

pub use kind::Kind;
pub use row::{ListData, OwnedRow, RowData, ValueList};
pub use schema::{Column, Field, Fields, Schema};
pub use value::Value;
