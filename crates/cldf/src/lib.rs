//! cldf: read, write and validate Cross-Linguistic Data Formats datasets.
//!
//! A CLDF dataset is a set of CSV tables described by a JSON metadata file.
//! Tables and columns are bound to terms of the CLDF ontology, and those
//! bindings drive the relations between tables: a column bound to
//! `languageReference` becomes a foreign key to the `LanguageTable` as soon as
//! the dataset has one.
//!
//! # Core Principles
//!
//! - **Semantic schema**: keys are inferred from term bindings, not declared
//! - **Streaming rows**: tables are read lazily, one row at a time
//! - **Caller-chosen strictness**: validation fails fast or collects findings
//!
//! # Example
//!
//! ```no_run
//! use cldf::{Dataset, ValidationLog};
//!
//! let ds = Dataset::from_metadata("StructureDataset-metadata.json")?;
//! let mut log = ValidationLog::new();
//! if !ds.validate(Some(&mut log))? {
//!     for observation in log.errors() {
//!         println!("{}", observation);
//!     }
//! }
//! # Ok::<(), cldf::CldfError>(())
//! ```

pub mod dataset;
pub mod error;
pub mod rows;
pub mod schema;
pub mod sources;
pub mod terms;
pub mod validation;

pub use dataset::{ColumnNames, Columns, ComponentSpec, Dataset, Module, TableStats};
pub use error::{CldfError, Result, ValidationFailure};
pub use rows::{Dialect, Row};
pub use schema::{Column, Datatype, ForeignKey, Table, TableGroup, Value};
pub use sources::{Reference, Source, Sources};
pub use terms::{TERMS, Term};
pub use validation::{
    Observation, ObservationType, Severity, ValidationEngine, ValidationError, ValidationLog,
    Validator,
};
