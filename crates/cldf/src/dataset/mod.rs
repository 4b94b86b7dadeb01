//! The dataset: metadata, tables, bibliography and their files.
//!
//! A [`Dataset`] owns its [`TableGroup`]. Tables are addressed by locator:
//! the table url, the name of the component the table conforms to, or the
//! component URI. Columns are addressed by name, property URI or property
//! term name, with names taking precedence.
//!
//! # Example
//!
//! ```no_run
//! use cldf::{Dataset, Row};
//!
//! let mut ds = Dataset::in_dir("mydata", "StructureDataset", false)?;
//! ds.add_component("LanguageTable", Vec::<&str>::new())?;
//! ds.write([
//!     ("ValueTable", vec![Row::new()
//!         .with("ID", "1")
//!         .with("Language_ID", "abc")
//!         .with("Parameter_ID", "p")]),
//!     ("LanguageTable", vec![Row::new().with("ID", "abc")]),
//! ])?;
//! assert!(ds.validate(None)?);
//! # Ok::<(), cldf::CldfError>(())
//! ```

mod cache;
pub mod components;
pub mod modules;
mod mutation;
mod wordlist;

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{CldfError, Result};
use crate::rows::{CellCodec, Dialect, RecordReader, Row, Rows, write_rows};
use crate::schema::{CONFORMS_TO, Column, Table, TableGroup};
use crate::sources::Sources;
use crate::terms::TERMS;
use crate::validation::{ValidationEngine, ValidationLog};

pub use cache::{ColumnNames, RowIndex};
pub use modules::{DEFAULT_MODULE, Module};
pub use mutation::{ComponentSpec, Columns};
pub use wordlist::multislice;

use cache::DatasetCache;

/// Suffix of metadata file names.
pub const MD_SUFFIX: &str = "-metadata.json";

/// Default file name of the bibliography.
pub const DEFAULT_BIBFILE: &str = "sources.bib";

/// Row count of one table, as reported by [`Dataset::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// File name.
    pub name: String,
    /// Component label, conformance URI, or empty.
    pub kind: String,
    pub rows: usize,
}

/// A CLDF dataset.
#[derive(Debug)]
pub struct Dataset {
    group: TableGroup,
    metadata_path: PathBuf,
    /// The bibliography.
    pub sources: Sources,
    cache: DatasetCache,
}

impl Dataset {
    /// Wrap a metadata document located at `metadata_path`.
    ///
    /// Loads the bibliography next to it and infers keys.
    pub fn new(group: TableGroup, metadata_path: impl Into<PathBuf>) -> Result<Self> {
        let mut ds = Self {
            group,
            metadata_path: metadata_path.into(),
            sources: Sources::new(),
            cache: DatasetCache::default(),
        };
        ds.sources = Sources::from_file(ds.bibpath())?;
        ds.auto_constraints();
        Ok(ds)
    }

    /// Load a dataset from its metadata file.
    pub fn from_metadata(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let group = TableGroup::from_file(path)?;
        debug!(path = %path.display(), tables = group.tables.len(), "loaded metadata");
        Self::new(group, path)
    }

    /// A new dataset of `module` in `dir`, created if missing.
    ///
    /// The tables of the module template are included unless `empty_tables`.
    pub fn in_dir(dir: impl AsRef<Path>, module: &str, empty_tables: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let module = modules::get(module)
            .ok_or_else(|| CldfError::Metadata(format!("unknown module: {}", module)))?;
        fs::create_dir_all(dir).map_err(|e| CldfError::io(dir, e))?;
        let mut group = module.template.clone();
        if empty_tables {
            group.tables.clear();
        }
        let path = dir.join(format!("{}{}", module.id(), MD_SUFFIX));
        Self::new(group, path)
    }

    /// A dataset for a bare core data file, e.g. `values.csv` or `forms.csv`.
    ///
    /// The header of the file must contain all required columns of the
    /// module's primary table.
    pub fn from_data(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let module = modules::for_file(path)
            .ok_or_else(|| CldfError::Metadata(format!("not a CLDF data file: {}", path.display())))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let ds = Self::in_dir(dir, module.id(), false)?;

        let file = fs::File::open(path).map_err(|e| CldfError::io(path, e))?;
        let mut header = String::new();
        BufReader::new(file)
            .read_line(&mut header)
            .map_err(|e| CldfError::io(path, e))?;
        let delimiter = ds.dialect().delimiter;
        let names: Vec<&str> = header.trim_end().split(delimiter).map(str::trim).collect();

        if let Some(primary) = module.primary_table() {
            let missing: Vec<&str> = ds
                .table(primary)?
                .columns()
                .iter()
                .filter(|c| c.required && !names.contains(&c.name.as_str()))
                .map(|c| c.name.as_str())
                .collect();
            if !missing.is_empty() {
                return Err(CldfError::Metadata(format!(
                    "{} lacks required columns: {}",
                    path.display(),
                    missing.join(", ")
                )));
            }
        }
        Ok(ds)
    }

    /// The metadata document.
    pub fn tablegroup(&self) -> &TableGroup {
        &self.group
    }

    /// Dataset-level properties (`dc:conformsTo`, `dc:title`, ...).
    pub fn properties(&self) -> &indexmap::IndexMap<String, serde_json::Value> {
        &self.group.properties
    }

    /// Set a dataset-level property.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.group.properties.insert(key.into(), value.into());
    }

    pub fn tables(&self) -> &[Table] {
        &self.group.tables
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Directory holding the metadata file; table urls resolve against it.
    pub fn directory(&self) -> &Path {
        self.metadata_path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn dialect(&self) -> Dialect {
        self.group.dialect()
    }

    /// Path of the bibliography file.
    pub fn bibpath(&self) -> PathBuf {
        let name = self
            .group
            .properties
            .get("dc:source")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_BIBFILE);
        self.directory().join(name)
    }

    /// Local name of the declared module; `Generic` when none is declared.
    pub fn module(&self) -> String {
        modules::declared_module(&self.group).unwrap_or_else(|| DEFAULT_MODULE.to_string())
    }

    /// CLDF version from the conformance URI, e.g. `v1.0`.
    pub fn version(&self) -> Option<String> {
        let uri = self.group.properties.get(CONFORMS_TO)?.as_str()?;
        uri.split('/').nth(3).map(str::to_string)
    }

    /// The component holding the core data.
    ///
    /// Determined by the declared module; datasets declaring no known module
    /// use the type of their first table.
    pub fn primary_table(&self) -> Option<String> {
        match modules::for_group(&self.group) {
            Some(module) => module.primary_table().map(str::to_string),
            None => self
                .group
                .tables
                .first()
                .and_then(Table::component_name)
                .map(str::to_string),
        }
    }

    pub(crate) fn table_index(&self, locator: &str) -> Option<usize> {
        let tables = &self.group.tables;
        tables
            .iter()
            .position(|t| t.url == locator)
            .or_else(|| tables.iter().position(|t| t.matches(locator)))
    }

    /// Resolve a table locator.
    pub fn table(&self, locator: &str) -> Result<&Table> {
        self.table_index(locator)
            .map(|i| &self.group.tables[i])
            .ok_or_else(|| CldfError::TableNotFound {
                locator: locator.to_string(),
            })
    }

    pub fn get_table(&self, locator: &str) -> Option<&Table> {
        self.table_index(locator).map(|i| &self.group.tables[i])
    }

    /// Resolve a column locator within a table.
    pub fn column(&self, table: &str, column: &str) -> Result<&Column> {
        self.table(table)?.column(column)
    }

    /// Cached map of property term names to local column names.
    pub fn column_names(&self) -> Arc<ColumnNames> {
        self.cache
            .column_names(|| ColumnNames::from_tables(&self.group.tables))
    }

    /// Drop all cached derived data.
    ///
    /// Needed only when table files are changed behind the dataset's back;
    /// mutations and writes through the dataset invalidate on their own.
    pub fn invalidate_caches(&self) {
        self.cache.invalidate();
    }

    /// Stream the rows of a table from its file.
    pub fn iter_rows(&self, table: &str) -> Result<Rows> {
        Rows::open(self.directory(), self.table(table)?, &self.dialect())
    }

    /// Look up a row by primary key value.
    pub fn get_row(&self, table: &str, id: &str) -> Result<Option<Row>> {
        let table = self.table(table)?;
        let key = match table.primary_key() {
            Some([name]) => table.column(name)?,
            Some(_) => {
                return Err(CldfError::Unsupported(format!(
                    "row lookup in {} with a composite primary key",
                    table.url
                )));
            }
            None => table.id_column().ok_or_else(|| {
                CldfError::Constraint(format!("{} has no primary key", table.url))
            })?,
        };
        let index = self.cache.row_index(&table.url, || {
            let codec = CellCodec::new(key)?;
            let mut index = RowIndex::new();
            for row in Rows::open(self.directory(), table, &self.dialect())? {
                let row = row?;
                index.insert(codec.write(row.get(&key.name))?, row);
            }
            debug!(table = %table.url, rows = index.len(), "built row index");
            Ok(index)
        })?;
        Ok(index.get(id).cloned())
    }

    /// Row counts per table, plus the bibliography size when it has entries.
    pub fn stats(&self) -> Result<Vec<TableStats>> {
        let dialect = self.dialect();
        let mut stats = Vec::with_capacity(self.group.tables.len() + 1);
        for table in &self.group.tables {
            let kind = match (table.component_name(), table.conforms_to()) {
                (Some(name), _) => TERMS
                    .get(name)
                    .map(|t| t.label.clone())
                    .unwrap_or_else(|| name.to_string()),
                (None, Some(uri)) => uri.to_string(),
                (None, None) => String::new(),
            };
            let rows = match RecordReader::open(self.directory(), table, &dialect)? {
                Some(reader) => {
                    let mut n = 0;
                    for record in reader {
                        record?;
                        n += 1;
                    }
                    n
                }
                None => 0,
            };
            stats.push(TableStats {
                name: table.url.clone(),
                kind,
                rows,
            });
        }
        if !self.sources.is_empty() {
            let name = self
                .bibpath()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_BIBFILE.to_string());
            stats.push(TableStats {
                name,
                kind: "Sources".to_string(),
                rows: self.sources.len(),
            });
        }
        Ok(stats)
    }

    /// Write the metadata file, to `path` or the dataset's metadata path.
    pub fn write_metadata(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path.unwrap_or(&self.metadata_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| CldfError::io(dir, e))?;
        }
        self.group.to_file(path)?;
        Ok(path.to_path_buf())
    }

    /// Write the bibliography, if it has entries.
    pub fn write_sources(&self) -> Result<Option<PathBuf>> {
        self.sources.write(self.bibpath(), None)
    }

    /// Write the rows of one table.
    pub fn write_table(&self, table: &str, rows: &[Row]) -> Result<usize> {
        let table = self.table(table)?;
        let path = self.directory().join(&table.url);
        let n = write_rows(&path, table, &self.dialect(), rows)?;
        self.cache.invalidate();
        Ok(n)
    }

    /// Write metadata, bibliography and the rows given per table locator.
    pub fn write<S, R>(&mut self, items: impl IntoIterator<Item = (S, R)>) -> Result<()>
    where
        S: AsRef<str>,
        R: AsRef<[Row]>,
    {
        let items = items
            .into_iter()
            .map(|(locator, rows)| {
                let index = self
                    .table_index(locator.as_ref())
                    .ok_or_else(|| CldfError::TableNotFound {
                        locator: locator.as_ref().to_string(),
                    })?;
                Ok((index, rows))
            })
            .collect::<Result<Vec<_>>>()?;

        if !self.sources.is_empty() && !self.group.properties.contains_key("dc:source") {
            self.set_property("dc:source", DEFAULT_BIBFILE);
        }
        self.write_metadata(None)?;
        self.write_sources()?;
        let dialect = self.dialect();
        for (index, rows) in items {
            let table = &self.group.tables[index];
            let path = self.directory().join(&table.url);
            write_rows(&path, table, &dialect, rows.as_ref())?;
        }
        self.cache.invalidate();
        Ok(())
    }

    /// Validate the dataset with the built-in validators.
    ///
    /// With `log` given, every problem is recorded and the result tells
    /// whether the dataset is valid. Without, the first error is returned.
    pub fn validate(&self, log: Option<&mut ValidationLog>) -> Result<bool> {
        ValidationEngine::new().validate(self, log)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<cldf:{}:{} at {}>",
            self.version().unwrap_or_else(|| "?".to_string()),
            self.module(),
            self.directory().display()
        )
    }
}
