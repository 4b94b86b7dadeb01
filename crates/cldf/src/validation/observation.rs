//! Observation types for validation findings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationFailure;

/// Kind of problem detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    /// A component required by the module is missing.
    MissingComponent,
    /// A column required by the module template is missing.
    MissingColumn,
    /// A conformance or property URI that is not a CLDF term.
    InvalidUri,
    /// Two columns of a table share a name.
    DuplicateColumn,
    /// Two columns of a table share a property binding.
    DuplicateProperty,
    /// Missing or composite primary key.
    PrimaryKey,
    /// A cell that does not conform to its datatype.
    TypeMismatch,
    /// A required cell is empty.
    MissingValue,
    /// A registered validator rejected a cell.
    ValidatorFailure,
    /// Two rows share a primary key value.
    Duplicate,
    /// A foreign key value without matching row in the target table.
    DanglingReference,
    /// A table file could not be read.
    Unreadable,
}

impl ObservationType {
    /// Display name used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ObservationType::MissingComponent => "Missing Component",
            ObservationType::MissingColumn => "Missing Column",
            ObservationType::InvalidUri => "Invalid URI",
            ObservationType::DuplicateColumn => "Duplicate Column",
            ObservationType::DuplicateProperty => "Duplicate Property",
            ObservationType::PrimaryKey => "Primary Key",
            ObservationType::TypeMismatch => "Type Mismatch",
            ObservationType::MissingValue => "Missing Value",
            ObservationType::ValidatorFailure => "Validator Failure",
            ObservationType::Duplicate => "Duplicate",
            ObservationType::DanglingReference => "Dangling Reference",
            ObservationType::Unreadable => "Unreadable",
        }
    }
}

/// How serious a finding is. Only errors make a dataset invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, e.g. progress notes.
    Info,
    /// Worth fixing, but the dataset is still valid.
    Warning,
    /// The dataset is invalid.
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// A validation finding, with the position it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Kind of finding.
    #[serde(rename = "type")]
    pub observation_type: ObservationType,
    pub severity: Severity,
    /// Url of the affected table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Affected column name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Line in the table file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// What is wrong, e.g. `abc not found in languages.csv:ID`.
    pub description: String,
}

impl Observation {
    /// An observation without position.
    pub fn new(
        observation_type: ObservationType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            observation_type,
            severity,
            table: None,
            column: None,
            line: None,
            description: description.into(),
        }
    }

    /// An error-level observation.
    pub fn error(observation_type: ObservationType, description: impl Into<String>) -> Self {
        Self::new(observation_type, Severity::Error, description)
    }

    /// A warning-level observation.
    pub fn warning(observation_type: ObservationType, description: impl Into<String>) -> Self {
        Self::new(observation_type, Severity::Warning, description)
    }

    /// Set the table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Set the line.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<Observation> for ValidationFailure {
    fn from(obs: Observation) -> Self {
        ValidationFailure {
            table: obs.table,
            column: obs.column,
            line: obs.line,
            message: obs.description,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ValidationFailure::from(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_observation() {
        let obs = Observation::error(ObservationType::Duplicate, "duplicate primary key: a")
            .with_table("languages.csv")
            .with_column("ID")
            .with_line(4);
        assert!(obs.is_error());
        assert_eq!(obs.to_string(), "languages.csv:4:ID duplicate primary key: a");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_serialize() {
        let obs = Observation::warning(ObservationType::PrimaryKey, "no primary key");
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["type"], "primary_key");
        assert_eq!(json["severity"], "warning");
        assert!(json.get("line").is_none());
    }
}
