//! Schema types for the tables of a dataset.

mod column;
mod group;
mod table;
mod types;

pub use column::{Column, ColumnSpec, resolve_column_spec};
pub use group::TableGroup;
pub use table::{CONFORMS_TO, ForeignKey, ForeignKeyReference, Table, TableSchema};
pub use types::{BaseType, Datatype, Value};
