//! Derived lookups built on first use and dropped on every schema change.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{CldfError, Result};
use crate::rows::Row;
use crate::schema::Table;

/// Local column names by table and property term.
///
/// Tables are keyed by component name (e.g. `LanguageTable`), or by url for
/// tables that do not conform to a component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnNames {
    tables: IndexMap<String, IndexMap<String, String>>,
}

impl ColumnNames {
    pub fn from_tables(tables: &[Table]) -> Self {
        let tables = tables
            .iter()
            .map(|table| {
                let key = table
                    .component_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| table.url.clone());
                let properties = table
                    .columns()
                    .iter()
                    .filter_map(|col| Some((col.term()?.name.clone(), col.name.clone())))
                    .collect();
                (key, properties)
            })
            .collect();
        Self { tables }
    }

    /// Property term name to column name, for one table.
    pub fn table(&self, component: &str) -> Result<&IndexMap<String, String>> {
        self.tables
            .get(component)
            .ok_or_else(|| CldfError::UnknownComponent(component.to_string()))
    }

    /// The column of `component` bound to `property`.
    pub fn get(&self, component: &str, property: &str) -> Result<&str> {
        self.table(component)?
            .get(property)
            .map(String::as_str)
            .ok_or_else(|| CldfError::UnknownProperty {
                component: component.to_string(),
                property: property.to_string(),
            })
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// Rows of one table by primary key value.
pub type RowIndex = HashMap<String, Row>;

/// The caches of a dataset.
///
/// Valid only until the next schema mutation or write; every mutating
/// method of the dataset calls [`DatasetCache::invalidate`].
#[derive(Debug, Default)]
pub(crate) struct DatasetCache {
    column_names: RefCell<Option<Arc<ColumnNames>>>,
    rows: RefCell<HashMap<String, Arc<RowIndex>>>,
}

impl DatasetCache {
    pub(crate) fn invalidate(&self) {
        self.column_names.borrow_mut().take();
        self.rows.borrow_mut().clear();
    }

    pub(crate) fn column_names(&self, build: impl FnOnce() -> ColumnNames) -> Arc<ColumnNames> {
        let mut slot = self.column_names.borrow_mut();
        Arc::clone(slot.get_or_insert_with(|| Arc::new(build())))
    }

    pub(crate) fn row_index(
        &self,
        url: &str,
        build: impl FnOnce() -> Result<RowIndex>,
    ) -> Result<Arc<RowIndex>> {
        if let Some(index) = self.rows.borrow().get(url) {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(build()?);
        self.rows
            .borrow_mut()
            .insert(url.to_string(), Arc::clone(&index));
        Ok(index)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.column_names.borrow().is_none() && self.rows.borrow().is_empty()
    }
}
