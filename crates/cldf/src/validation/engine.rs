//! The validation pipeline.
//!
//! Stages run in a fixed order: module conformance, per-table structure, one
//! streaming pass over the rows of every table (datatypes, required cells,
//! registered validators, primary-key uniqueness), and finally referential
//! integrity over the key sets collected while streaming.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::dataset::{Dataset, modules};
use crate::error::{CldfError, Result};
use crate::rows::{CellCodec, RecordReader, Row};
use crate::schema::{Column, Table};
use crate::terms::TERMS;

use super::log::ValidationLog;
use super::observation::{Observation, ObservationType};
use super::validators::{RegisteredValidator, Validator, builtin_validators};

/// Routes findings to the log, or fails on the first error without one.
struct Reporter<'a> {
    log: Option<&'a mut ValidationLog>,
    valid: bool,
}

impl<'a> Reporter<'a> {
    fn new(log: Option<&'a mut ValidationLog>) -> Self {
        Self { log, valid: true }
    }

    fn error(&mut self, observation: Observation) -> Result<()> {
        self.valid = false;
        match self.log.as_deref_mut() {
            Some(log) => {
                log.record(observation);
                Ok(())
            }
            None => Err(CldfError::Validation(observation.into())),
        }
    }

    /// Warnings never fail validation.
    fn warning(&mut self, observation: Observation) {
        match self.log.as_deref_mut() {
            Some(log) => log.record(observation),
            None => warn!(kind = observation.observation_type.label(), "{}", observation),
        }
    }
}

/// A table url plus the columns forming a key in it.
type KeyColumns = (String, Vec<String>);

/// The cell texts of one key, one part per key column.
type Key = Vec<String>;

/// Foreign key values seen while streaming, checked once all tables are read.
struct PendingReference {
    table: String,
    column: String,
    target: KeyColumns,
    values: Vec<(usize, Key)>,
}

fn cell_error(
    kind: ObservationType,
    description: impl Into<String>,
    table: &Table,
    column: &str,
    line: usize,
) -> Observation {
    Observation::error(kind, description)
        .with_table(&table.url)
        .with_column(column)
        .with_line(line)
}

/// Keys of `row` over the columns at `indices`.
///
/// A single list-valued column contributes one key per item. Composite keys
/// with a null part contribute nothing. Parts stay separate, since cell text
/// may itself contain commas.
fn key_values(
    columns: &[(&Column, CellCodec, Option<usize>)],
    indices: &[usize],
    row: &Row,
) -> Result<Vec<Key>> {
    if let [i] = indices {
        let (column, codec, _) = &columns[*i];
        let Some(value) = row.get(&column.name) else {
            return Ok(Vec::new());
        };
        return value
            .items()
            .map(|item| codec.write(Some(item)).map(|text| vec![text]))
            .collect();
    }
    let mut parts = Vec::with_capacity(indices.len());
    for i in indices {
        let (column, codec, _) = &columns[*i];
        match row.get(&column.name) {
            Some(value) => parts.push(codec.write(Some(value))?),
            None => return Ok(Vec::new()),
        }
    }
    Ok(vec![parts])
}

fn positions(columns: &[(&Column, CellCodec, Option<usize>)], names: &[String]) -> Option<Vec<usize>> {
    names
        .iter()
        .map(|name| columns.iter().position(|(c, ..)| c.name == *name))
        .collect()
}

/// Runs the validation pipeline over a dataset.
///
/// # Example
///
/// ```no_run
/// use cldf::{Dataset, ValidationEngine, ValidationError, ValidationLog};
///
/// let ds = Dataset::from_metadata("Wordlist-metadata.json")?;
/// let engine = ValidationEngine::new().with_validator(
///     Some("FormTable"),
///     "form",
///     |_: &Dataset, _: &cldf::Table, col: &cldf::Column, row: &cldf::Row| {
///         match row.get_str(&col.name) {
///             Some(form) if form.contains(' ') => Err(ValidationError::new("form with blank")),
///             _ => Ok(()),
///         }
///     },
/// );
/// let mut log = ValidationLog::new();
/// let valid = engine.validate(&ds, Some(&mut log))?;
/// # Ok::<(), cldf::CldfError>(())
/// ```
#[derive(Debug)]
pub struct ValidationEngine {
    validators: Vec<RegisteredValidator>,
}

impl ValidationEngine {
    /// An engine with the built-in validators.
    pub fn new() -> Self {
        Self {
            validators: builtin_validators(),
        }
    }

    /// An engine running no row validators; structure, datatypes and keys
    /// are still checked.
    pub fn without_builtins() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Register a validator for `property` (URI or term name), optionally
    /// restricted to the table addressed by `table`.
    pub fn with_validator(
        mut self,
        table: Option<&str>,
        property: &str,
        validator: impl Validator + 'static,
    ) -> Self {
        self.validators
            .push(RegisteredValidator::new(table, property, validator));
        self
    }

    pub fn validators(&self) -> &[RegisteredValidator] {
        &self.validators
    }

    /// Validate `dataset`.
    ///
    /// With a log, every finding is recorded and `Ok(false)` signals an
    /// invalid dataset. Without, the first error aborts the run with
    /// [`CldfError::Validation`]. Warnings never affect the outcome.
    pub fn validate(&self, dataset: &Dataset, log: Option<&mut ValidationLog>) -> Result<bool> {
        let mut reporter = Reporter::new(log);

        check_module(dataset, &mut reporter)?;
        for table in dataset.tables() {
            check_structure(table, &mut reporter)?;
        }

        let mut keys: HashMap<KeyColumns, HashSet<Key>> = HashMap::new();
        let mut pending = Vec::new();
        for table in dataset.tables() {
            for fk in table.foreign_keys() {
                let target = dataset
                    .get_table(&fk.reference.resource)
                    .map(|t| t.url.clone())
                    .unwrap_or_else(|| fk.reference.resource.clone());
                let target = (target, fk.reference.column_reference.clone());
                keys.entry(target.clone()).or_default();
                pending.push(PendingReference {
                    table: table.url.clone(),
                    column: fk.column_reference.join(","),
                    target,
                    values: Vec::new(),
                });
            }
        }

        for table in dataset.tables() {
            self.check_rows(dataset, table, &mut keys, &mut pending, &mut reporter)?;
        }
        check_references(dataset, &keys, &pending, &mut reporter)?;

        debug!(valid = reporter.valid, "validated {}", dataset);
        Ok(reporter.valid)
    }

    fn check_rows(
        &self,
        dataset: &Dataset,
        table: &Table,
        keys: &mut HashMap<KeyColumns, HashSet<Key>>,
        pending: &mut [PendingReference],
        reporter: &mut Reporter<'_>,
    ) -> Result<()> {
        let reader = match RecordReader::open(dataset.directory(), table, &dataset.dialect()) {
            Ok(Some(reader)) => reader,
            Ok(None) => {
                reporter.warning(
                    Observation::warning(ObservationType::Unreadable, "table file not found")
                        .with_table(&table.url),
                );
                return Ok(());
            }
            Err(e) => {
                return reporter.error(
                    Observation::error(ObservationType::Unreadable, e.to_string())
                        .with_table(&table.url),
                );
            }
        };

        let mut columns = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            match CellCodec::new(column) {
                Ok(codec) => {
                    let position = reader.header().iter().position(|h| *h == column.name);
                    if column.required && position.is_none() {
                        reporter.error(
                            Observation::error(
                                ObservationType::MissingColumn,
                                "required column missing from file",
                            )
                            .with_table(&table.url)
                            .with_column(&column.name),
                        )?;
                    }
                    columns.push((column, codec, position));
                }
                Err(e) => reporter.error(
                    Observation::error(ObservationType::TypeMismatch, e.to_string())
                        .with_table(&table.url)
                        .with_column(&column.name),
                )?,
            }
        }

        let validators: Vec<(&Column, &dyn Validator)> = columns
            .iter()
            .flat_map(|(column, ..)| {
                self.validators
                    .iter()
                    .filter(move |v| v.applies_to(table, column))
                    .map(move |v| (*column, &*v.validator))
            })
            .collect();

        let primary_key = table
            .primary_key()
            .and_then(|names| positions(&columns, names));
        let targets: Vec<(KeyColumns, Vec<usize>)> = keys
            .keys()
            .filter(|(url, _)| *url == table.url)
            .filter_map(|k| positions(&columns, &k.1).map(|p| (k.clone(), p)))
            .collect();
        let sources: Vec<(usize, Vec<usize>)> = table
            .foreign_keys()
            .iter()
            .zip(pending.iter().enumerate().filter(|(_, p)| p.table == table.url))
            .filter_map(|(fk, (i, _))| positions(&columns, &fk.column_reference).map(|p| (i, p)))
            .collect();

        let mut seen: HashMap<Key, usize> = HashMap::new();
        let mut rows = 0;
        for record in reader {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    return reporter.error(
                        Observation::error(ObservationType::Unreadable, e.to_string())
                            .with_table(&table.url),
                    );
                }
            };
            rows += 1;
            let line = record.line;

            let mut row = Row::new();
            let mut unreadable = HashSet::new();
            for (column, codec, position) in &columns {
                let text = position
                    .and_then(|i| record.cells.get(i))
                    .map(String::as_str)
                    .unwrap_or("");
                match codec.read(text) {
                    Ok(value) => row.set(column.name.clone(), value),
                    Err(e) => {
                        unreadable.insert(column.name.as_str());
                        reporter.error(cell_error(
                            ObservationType::TypeMismatch,
                            e.to_string(),
                            table,
                            &column.name,
                            line,
                        ))?;
                    }
                }
            }

            for (column, _, position) in &columns {
                if column.required
                    && position.is_some()
                    && !unreadable.contains(column.name.as_str())
                    && row.get(&column.name).is_none()
                {
                    reporter.error(cell_error(
                        ObservationType::MissingValue,
                        "required value missing",
                        table,
                        &column.name,
                        line,
                    ))?;
                }
            }

            for (column, validator) in &validators {
                if let Err(e) = validator.check(dataset, table, column, &row) {
                    reporter.error(cell_error(
                        ObservationType::ValidatorFailure,
                        e.message,
                        table,
                        &column.name,
                        line,
                    ))?;
                }
            }

            if let Some(indices) = &primary_key {
                for key in key_values(&columns, indices, &row)? {
                    match seen.entry(key) {
                        Entry::Occupied(first) => {
                            let column = table.primary_key().map(|pk| pk.join(",")).unwrap_or_default();
                            reporter.error(cell_error(
                                ObservationType::Duplicate,
                                format!(
                                    "duplicate primary key: {} (first on line {})",
                                    first.key().join(","),
                                    first.get()
                                ),
                                table,
                                &column,
                                line,
                            ))?;
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(line);
                        }
                    }
                }
            }

            for (target, indices) in &targets {
                let values = key_values(&columns, indices, &row)?;
                if let Some(set) = keys.get_mut(target) {
                    set.extend(values);
                }
            }
            for (i, indices) in &sources {
                for key in key_values(&columns, indices, &row)? {
                    pending[*i].values.push((line, key));
                }
            }
        }
        debug!(table = %table.url, rows, "validated rows");
        Ok(())
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn check_module(dataset: &Dataset, reporter: &mut Reporter<'_>) -> Result<()> {
    let Some(module) = modules::get(&dataset.module()) else {
        return Ok(());
    };
    for template in &module.template.tables {
        let Some(uri) = template.conforms_to() else {
            continue;
        };
        let component = template.component_name().unwrap_or(uri);
        let Some(table) = dataset.get_table(uri) else {
            reporter.error(Observation::error(
                ObservationType::MissingComponent,
                format!("{} requires {}", module.id(), component),
            ))?;
            continue;
        };
        for column in template.columns().iter().filter(|c| c.is_required_by_template()) {
            let Some(property) = column.property_url.as_deref() else {
                continue;
            };
            if !table
                .columns()
                .iter()
                .any(|c| c.property_url.as_deref() == Some(property))
            {
                reporter.error(
                    Observation::error(
                        ObservationType::MissingColumn,
                        format!("{} requires column {}", component, property),
                    )
                    .with_table(&table.url),
                )?;
            }
        }
    }
    Ok(())
}

fn check_structure(table: &Table, reporter: &mut Reporter<'_>) -> Result<()> {
    if let Err(e) = table.table_type() {
        reporter.error(
            Observation::error(ObservationType::InvalidUri, e.to_string()).with_table(&table.url),
        )?;
    }

    let mut names = HashSet::new();
    let mut properties = HashSet::new();
    for column in table.columns() {
        if !names.insert(column.name.as_str()) {
            reporter.error(
                Observation::error(
                    ObservationType::DuplicateColumn,
                    format!("duplicate column name: {}", column.name),
                )
                .with_table(&table.url)
                .with_column(&column.name),
            )?;
        }
        let Some(uri) = column.property_url.as_deref() else {
            continue;
        };
        if let Err(e) = TERMS.is_cldf_uri(uri) {
            reporter.error(
                Observation::error(ObservationType::InvalidUri, e.to_string())
                    .with_table(&table.url)
                    .with_column(&column.name),
            )?;
        }
        if !properties.insert(uri) {
            reporter.error(
                Observation::error(
                    ObservationType::DuplicateProperty,
                    format!("duplicate property binding: {}", uri),
                )
                .with_table(&table.url)
                .with_column(&column.name),
            )?;
        }
    }

    match table.primary_key() {
        None => reporter.warning(
            Observation::warning(ObservationType::PrimaryKey, "table has no primary key")
                .with_table(&table.url),
        ),
        Some(pk) if pk.len() > 1 => reporter.warning(
            Observation::warning(
                ObservationType::PrimaryKey,
                "table has a composite primary key",
            )
            .with_table(&table.url),
        ),
        Some(_) => {}
    }
    Ok(())
}

fn check_references(
    dataset: &Dataset,
    keys: &HashMap<KeyColumns, HashSet<Key>>,
    pending: &[PendingReference],
    reporter: &mut Reporter<'_>,
) -> Result<()> {
    for reference in pending {
        let (target, target_columns) = &reference.target;
        if dataset.get_table(target).is_none() {
            reporter.error(
                Observation::error(
                    ObservationType::DanglingReference,
                    format!("foreign key to unknown table {}", target),
                )
                .with_table(&reference.table)
                .with_column(&reference.column),
            )?;
            continue;
        }
        let known = keys.get(&reference.target);
        for (line, value) in &reference.values {
            if known.is_some_and(|set| set.contains(value)) {
                continue;
            }
            reporter.error(
                Observation::error(
                    ObservationType::DanglingReference,
                    format!(
                        "{} not found in {}:{}",
                        value.join(","),
                        target,
                        target_columns.join(",")
                    ),
                )
                .with_table(&reference.table)
                .with_column(&reference.column)
                .with_line(*line),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validators::ValidationError;

    fn structure_dataset() -> (tempfile::TempDir, Dataset) {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = Dataset::in_dir(dir.path(), "StructureDataset", false).unwrap();
        ds.add_component("LanguageTable", Vec::<&str>::new()).unwrap();
        (dir, ds)
    }

    fn value(id: &str, language: &str) -> Row {
        Row::new()
            .with("ID", id)
            .with("Language_ID", language)
            .with("Parameter_ID", "p")
            .with("Value", "x")
    }

    #[test]
    fn test_dangling_reference_fails() {
        let (_dir, mut ds) = structure_dataset();
        ds.write([("ValueTable", vec![value("1", "abc")]), ("LanguageTable", vec![])])
            .unwrap();

        let err = ds.validate(None).unwrap_err();
        assert!(matches!(err, CldfError::Validation(_)));
        assert!(err.to_string().contains("abc"));

        let mut log = ValidationLog::new();
        assert!(!ds.validate(Some(&mut log)).unwrap());
        assert_eq!(
            log.errors().next().unwrap().observation_type,
            ObservationType::DanglingReference
        );

        ds.write([
            ("ValueTable", vec![value("1", "abc")]),
            ("LanguageTable", vec![Row::new().with("ID", "abc").with("Name", "language")]),
        ])
        .unwrap();
        assert!(ds.validate(None).unwrap());
    }

    #[test]
    fn test_duplicate_primary_key() {
        let (_dir, mut ds) = structure_dataset();
        ds.write([
            ("ValueTable", vec![value("1", "abc"), value("1", "abc")]),
            ("LanguageTable", vec![Row::new().with("ID", "abc")]),
        ])
        .unwrap();
        let mut log = ValidationLog::new();
        assert!(!ds.validate(Some(&mut log)).unwrap());
        let dup = log.errors().next().unwrap();
        assert_eq!(dup.observation_type, ObservationType::Duplicate);
        assert_eq!(dup.line, Some(3));
    }

    #[test]
    fn test_accumulate_reports_all() {
        let (_dir, mut ds) = structure_dataset();
        ds.write([
            ("ValueTable", vec![value("1", "x"), value("2", "y")]),
            ("LanguageTable", vec![]),
        ])
        .unwrap();
        let mut log = ValidationLog::new();
        assert!(!ds.validate(Some(&mut log)).unwrap());
        assert_eq!(log.errors().count(), 2);
    }

    #[test]
    fn test_missing_component() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::in_dir(dir.path(), "Wordlist", true).unwrap();
        let err = ds.validate(None).unwrap_err();
        assert!(err.to_string().contains("Wordlist requires FormTable"));
    }

    #[test]
    fn test_missing_primary_key_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = Dataset::in_dir(dir.path(), "Generic", true).unwrap();
        ds.add_table("things.csv", ["Name"], None).unwrap();
        ds.write([("things.csv", vec![Row::new().with("Name", "a")])])
            .unwrap();
        let mut log = ValidationLog::new();
        assert!(ds.validate(Some(&mut log)).unwrap());
        assert_eq!(log.warnings().count(), 1);
        assert!(ds.validate(None).unwrap());
    }

    #[test]
    fn test_composite_key_parts_with_commas() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = Dataset::in_dir(dir.path(), "Generic", true).unwrap();
        ds.add_table("pairs.csv", ["a", "b"], Some(&["a", "b"][..])).unwrap();
        let pair = |a: &str, b: &str| Row::new().with("a", a).with("b", b);

        ds.write([("pairs.csv", vec![pair("x,y", "z"), pair("x", "y,z")])])
            .unwrap();
        assert!(ds.validate(None).unwrap());

        ds.write([(
            "pairs.csv",
            vec![pair("x,y", "z"), pair("x", "y,z"), pair("x", "y,z")],
        )])
        .unwrap();
        let mut log = ValidationLog::new();
        assert!(!ds.validate(Some(&mut log)).unwrap());
        let dup = log.errors().next().unwrap();
        assert_eq!(dup.observation_type, ObservationType::Duplicate);
        assert_eq!(dup.line, Some(4));
        assert_eq!(log.errors().count(), 1);
    }

    #[test]
    fn test_custom_validator() {
        let (_dir, mut ds) = structure_dataset();
        ds.write([
            ("ValueTable", vec![value("1", "abc")]),
            ("LanguageTable", vec![Row::new().with("ID", "abc").with("Name", "")]),
        ])
        .unwrap();
        let engine = ValidationEngine::new().with_validator(
            Some("ValueTable"),
            "value",
            |_: &Dataset, _: &Table, _: &Column, _: &Row| Err(ValidationError::new("no values allowed")),
        );
        let err = engine.validate(&ds, None).unwrap_err();
        assert_eq!(err.to_string(), "values.csv:2:Value no values allowed");
        assert!(ValidationEngine::new().validate(&ds, None).unwrap());
    }
}
