//! Row-level semantic validators.
//!
//! A validator is registered for a property URI, optionally restricted to one
//! table, and is called for every row of every table with a column bound to
//! that property.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dataset::Dataset;
use crate::error::CldfError;
use crate::rows::Row;
use crate::schema::{Column, Table, Value};
use crate::terms::term_uri;

/// Why a validator rejected a row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<CldfError> for ValidationError {
    fn from(e: CldfError) -> Self {
        Self::new(e.to_string())
    }
}

/// Trait for validators.
pub trait Validator {
    /// Check the cell of `column` in `row`.
    fn check(
        &self,
        dataset: &Dataset,
        table: &Table,
        column: &Column,
        row: &Row,
    ) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Dataset, &Table, &Column, &Row) -> Result<(), ValidationError>,
{
    fn check(
        &self,
        dataset: &Dataset,
        table: &Table,
        column: &Column,
        row: &Row,
    ) -> Result<(), ValidationError> {
        self(dataset, table, column, row)
    }
}

/// A validator with the property (and optional table) it applies to.
pub struct RegisteredValidator {
    /// Table locator; `None` applies to all tables.
    pub table: Option<String>,
    /// Property URI.
    pub property: String,
    pub validator: Box<dyn Validator>,
}

impl std::fmt::Debug for RegisteredValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredValidator")
            .field("table", &self.table)
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

impl RegisteredValidator {
    pub fn new(table: Option<&str>, property: &str, validator: impl Validator + 'static) -> Self {
        Self {
            table: table.map(str::to_string),
            property: term_uri(property),
            validator: Box::new(validator),
        }
    }

    /// Whether the validator should run for `column` of `table`.
    pub fn applies_to(&self, table: &Table, column: &Column) -> bool {
        column.property_url.as_deref() == Some(self.property.as_str())
            && self.table.as_deref().is_none_or(|scope| table.matches(scope))
    }
}

static ISO639P3_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{3}$").expect("valid ISO 639-3 pattern"));

static GLOTTOCODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{4}[0-9]{4}$").expect("valid glottocode pattern"));

/// Checks string values against a regular expression.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: Regex,
    name: String,
}

impl PatternValidator {
    pub fn new(pattern: Regex, name: impl Into<String>) -> Self {
        Self {
            pattern,
            name: name.into(),
        }
    }

    pub fn iso639p3() -> Self {
        Self::new(ISO639P3_PATTERN.clone(), "ISO 639-3 code")
    }

    pub fn glottocode() -> Self {
        Self::new(GLOTTOCODE_PATTERN.clone(), "glottocode")
    }
}

impl Validator for PatternValidator {
    fn check(&self, _: &Dataset, _: &Table, column: &Column, row: &Row) -> Result<(), ValidationError> {
        let Some(value) = row.get(&column.name) else {
            return Ok(());
        };
        for item in value.items().filter_map(Value::as_str) {
            if !self.pattern.is_match(item) {
                return Err(ValidationError::new(format!("invalid {}: {}", self.name, item)));
            }
        }
        Ok(())
    }
}

/// Checks that glosses and analyzed words of an example have the same
/// number of items.
///
/// Items are list items. A cell of a column without separator is a single
/// item, whatever its length, so two unsplit cells always agree; characters
/// are never counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgtValidator;

/// Number of items in a cell: list length, or 1 for a scalar.
fn item_count(value: &Value) -> usize {
    value.as_list().map_or(1, <[Value]>::len)
}

impl Validator for IgtValidator {
    fn check(&self, _: &Dataset, table: &Table, column: &Column, row: &Row) -> Result<(), ValidationError> {
        let Some(gloss) = row.get(&column.name) else {
            return Ok(());
        };
        let Some(words) = table
            .get_column(&term_uri("analyzedWord"))
            .and_then(|c| row.get(&c.name))
        else {
            return Ok(());
        };
        let (glosses, morphemes) = (item_count(gloss), item_count(words));
        if glosses > 0 && morphemes > 0 && glosses != morphemes {
            return Err(ValidationError::new(
                "number of morphemes and glosses does not match",
            ));
        }
        Ok(())
    }
}

/// Checks that every cited source key is in the bibliography.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceReferenceValidator;

impl Validator for SourceReferenceValidator {
    fn check(&self, dataset: &Dataset, _: &Table, column: &Column, row: &Row) -> Result<(), ValidationError> {
        let Some(value) = row.get(&column.name) else {
            return Ok(());
        };
        let refs: Vec<&str> = value.items().filter_map(Value::as_str).collect();
        dataset.sources.validate(&refs)?;
        Ok(())
    }
}

/// The validators every validation run starts with.
pub fn builtin_validators() -> Vec<RegisteredValidator> {
    vec![
        RegisteredValidator::new(None, "iso639P3code", PatternValidator::iso639p3()),
        RegisteredValidator::new(None, "glottocode", PatternValidator::glottocode()),
        RegisteredValidator::new(None, "gloss", IgtValidator),
        RegisteredValidator::new(None, "source", SourceReferenceValidator),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let dir = tempfile::tempdir().unwrap();
        Dataset::in_dir(dir.path(), "Generic", true).unwrap()
    }

    #[test]
    fn test_pattern_validator() {
        let ds = dataset();
        let table = Table::new("languages.csv");
        let col = Column::new("Glottocode").with_property("glottocode");
        let v = PatternValidator::glottocode();
        assert!(v.check(&ds, &table, &col, &Row::new().with("Glottocode", "abcd1234")).is_ok());
        assert!(v.check(&ds, &table, &col, &Row::new()).is_ok());
        let err = v
            .check(&ds, &table, &col, &Row::new().with("Glottocode", "abc"))
            .unwrap_err();
        assert_eq!(err.message, "invalid glottocode: abc");
    }

    #[test]
    fn test_igt_validator() {
        let ds = dataset();
        let mut table = Table::new("examples.csv");
        table.schema.columns = vec![
            Column::new("Analyzed_Word").with_property("analyzedWord").with_separator("\t"),
            Column::new("Gloss").with_property("gloss").with_separator("\t"),
        ];
        let gloss = table.columns()[1].clone();
        let ok = Row::new()
            .with("Analyzed_Word", vec!["a", "b"])
            .with("Gloss", vec!["A", "B"]);
        assert!(IgtValidator.check(&ds, &table, &gloss, &ok).is_ok());

        let bad = Row::new()
            .with("Analyzed_Word", vec!["a", "b"])
            .with("Gloss", vec!["A"]);
        assert!(IgtValidator.check(&ds, &table, &gloss, &bad).is_err());
    }

    #[test]
    fn test_igt_unsplit_cells_count_as_one_item() {
        let ds = dataset();
        let mut table = Table::new("examples.csv");
        table.schema.columns = vec![
            Column::new("Analyzed_Word").with_property("analyzedWord"),
            Column::new("Gloss").with_property("gloss"),
        ];
        let gloss = table.columns()[1].clone();
        let row = Row::new()
            .with("Analyzed_Word", "ab")
            .with("Gloss", "ABC.DEF");
        assert!(IgtValidator.check(&ds, &table, &gloss, &row).is_ok());

        let row = Row::new()
            .with("Analyzed_Word", vec!["a", "b"])
            .with("Gloss", "A");
        assert!(IgtValidator.check(&ds, &table, &gloss, &row).is_err());
    }

    #[test]
    fn test_source_validator_names_key() {
        let ds = dataset();
        let col = Column::new("Source").with_property("source").with_separator(";");
        let row = Row::new().with("Source", vec!["key[1-20]"]);
        let err = SourceReferenceValidator
            .check(&ds, &Table::new("values.csv"), &col, &row)
            .unwrap_err();
        assert!(err.message.contains("key"));
    }

    #[test]
    fn test_applies_to() {
        let scoped = RegisteredValidator::new(
            Some("LanguageTable"),
            "name",
            |_: &Dataset, _: &Table, _: &Column, _: &Row| Ok(()),
        );
        let col = Column::new("Name").with_property("name");
        let mut languages = Table::new("languages.csv");
        languages.set_conforms_to(term_uri("LanguageTable"));
        assert!(scoped.applies_to(&languages, &col));
        assert!(!scoped.applies_to(&Table::new("other.csv"), &col));
        assert!(!scoped.applies_to(&languages, &Column::new("Name")));
    }
}
