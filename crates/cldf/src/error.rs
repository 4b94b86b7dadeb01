//! Error types for the cldf library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for CLDF operations.
#[derive(Debug, Error)]
pub enum CldfError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reading a zipped table.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed metadata document.
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    /// A table locator did not resolve.
    #[error("No table '{locator}' in dataset")]
    TableNotFound { locator: String },

    /// A column locator did not resolve within a table.
    #[error("No column '{locator}' in table '{table}'")]
    ColumnNotFound { locator: String, table: String },

    /// A column spec of a shape that cannot describe a column.
    #[error("Invalid column spec: {0}")]
    InvalidColumnSpec(String),

    /// A schema mutation would break an invariant; nothing was changed.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The requested operation is not supported.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// A URI within the CLDF namespace that the term registry does not know.
    #[error("Unknown CLDF term: {0}")]
    UnknownTerm(String),

    /// A known term used as table conformance although it is not a component.
    #[error("Invalid table conformance: {0}")]
    InvalidConformance(String),

    /// No table of this component (or url) in the column-name map.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// The component has no column bound to this property.
    #[error("Unknown property '{property}' for {component}")]
    UnknownProperty { component: String, property: String },

    /// A cell could not be converted to or from its datatype.
    #[error("Invalid {datatype} value '{value}': {reason}")]
    InvalidValue {
        value: String,
        datatype: String,
        reason: String,
    },

    /// A malformed citation string.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A citation key with no matching bibliography entry.
    #[error("Missing source key: {0}")]
    MissingSource(String),

    /// Error parsing BibTeX.
    #[error("BibTeX error at line {line}: {message}")]
    Bibtex { line: usize, message: String },

    /// Data-level validation failure raised in strict mode.
    #[error("{0}")]
    Validation(ValidationFailure),
}

impl CldfError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CldfError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Context of a failed validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Table url, when the failure concerns a table.
    pub table: Option<String>,
    /// Column name, when the failure concerns a column.
    pub column: Option<String>,
    /// Line number in the table file (header is line 1).
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut location = Vec::new();
        if let Some(table) = &self.table {
            location.push(table.clone());
        }
        if let Some(line) = self.line {
            location.push(line.to_string());
        }
        if let Some(column) = &self.column {
            location.push(column.clone());
        }
        if location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} {}", location.join(":"), self.message)
        }
    }
}

/// Result type alias for CLDF operations.
pub type Result<T> = std::result::Result<T, CldfError>;
