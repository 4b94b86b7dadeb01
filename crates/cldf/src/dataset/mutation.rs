//! Schema mutation and automatic key inference.
//!
//! Every mutation either applies completely or fails without changing the
//! schema. Successful mutations re-run key inference over the whole dataset
//! and drop the dataset caches.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{CldfError, Result};
use crate::schema::{Column, ColumnSpec, ForeignKey, Table, resolve_column_spec};

use super::Dataset;
use super::components;

/// A component to add: a template name (or URI), a full table, or a table
/// in metadata JSON form.
#[derive(Debug, Clone)]
pub enum ComponentSpec {
    Name(String),
    Table(Table),
    Value(serde_json::Value),
}

impl From<&str> for ComponentSpec {
    fn from(s: &str) -> Self {
        ComponentSpec::Name(s.to_string())
    }
}

impl From<String> for ComponentSpec {
    fn from(s: String) -> Self {
        ComponentSpec::Name(s)
    }
}

impl From<Table> for ComponentSpec {
    fn from(t: Table) -> Self {
        ComponentSpec::Table(t)
    }
}

impl From<serde_json::Value> for ComponentSpec {
    fn from(v: serde_json::Value) -> Self {
        ComponentSpec::Value(v)
    }
}

impl ComponentSpec {
    fn into_table(self) -> Result<Table> {
        match self {
            ComponentSpec::Name(name) => components::template(&name),
            ComponentSpec::Table(table) => Ok(table),
            ComponentSpec::Value(value) => Ok(serde_json::from_value(value)?),
        }
    }
}

/// One column, or a list of columns for a composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Columns {
    fn from(s: &str) -> Self {
        Columns::One(s.to_string())
    }
}

impl From<String> for Columns {
    fn from(s: String) -> Self {
        Columns::One(s)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(v: Vec<&str>) -> Self {
        Columns::Many(v.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(v: [&str; N]) -> Self {
        Columns::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Append resolved columns to `table`, rejecting duplicate names and
/// duplicate property bindings. `table` is left untouched on error.
fn append_columns(table: &mut Table, columns: Vec<Column>) -> Result<()> {
    let mut names: HashSet<String> = table.columns().iter().map(|c| c.name.clone()).collect();
    let mut properties: HashSet<String> = table
        .columns()
        .iter()
        .filter_map(|c| c.property_url.clone())
        .collect();
    for col in &columns {
        if !names.insert(col.name.clone()) {
            return Err(CldfError::Constraint(format!(
                "Duplicate column name: {} in {}",
                col.name, table.url
            )));
        }
        if let Some(uri) = &col.property_url {
            if !properties.insert(uri.clone()) {
                return Err(CldfError::Constraint(format!(
                    "Duplicate column property: {} in {}",
                    uri, table.url
                )));
            }
        }
    }
    table.schema.columns.extend(columns);
    Ok(())
}

fn resolve_specs<I>(specs: I) -> Result<Vec<Column>>
where
    I: IntoIterator,
    I::Item: Into<ColumnSpec>,
{
    specs.into_iter().map(|spec| resolve_column_spec(spec)).collect()
}

impl Dataset {
    /// Add a table at `url` with the given columns.
    pub fn add_table<I>(&mut self, url: &str, columns: I, primary_key: Option<&[&str]>) -> Result<&Table>
    where
        I: IntoIterator,
        I::Item: Into<ColumnSpec>,
    {
        if self.group.tables.iter().any(|t| t.url == url) {
            return Err(CldfError::Constraint(format!("table {} already exists", url)));
        }
        let mut table = Table::new(url);
        append_columns(&mut table, resolve_specs(columns)?)?;
        if let Some(pk) = primary_key {
            for name in pk {
                table.column(name)?;
            }
            table.schema.primary_key = Some(pk.iter().map(|s| s.to_string()).collect());
        }
        self.push_table(table)
    }

    /// Add a component, optionally with extra columns.
    ///
    /// Components are singletons: adding a second table of the same
    /// component type fails.
    pub fn add_component<I>(&mut self, component: impl Into<ComponentSpec>, columns: I) -> Result<&Table>
    where
        I: IntoIterator,
        I::Item: Into<ColumnSpec>,
    {
        let mut table = component.into().into_table()?;
        append_columns(&mut table, resolve_specs(columns)?)?;
        if let Some(kind) = table.table_type()? {
            if self
                .group
                .tables
                .iter()
                .any(|t| t.component_name() == Some(kind))
            {
                return Err(CldfError::Constraint(format!(
                    "components must not be added twice: {}",
                    kind
                )));
            }
        }
        if self.group.tables.iter().any(|t| t.url == table.url) {
            return Err(CldfError::Constraint(format!(
                "table {} already exists",
                table.url
            )));
        }
        self.push_table(table)
    }

    fn push_table(&mut self, table: Table) -> Result<&Table> {
        debug!(url = %table.url, "adding table");
        self.group.tables.push(table);
        self.auto_constraints();
        self.cache.invalidate();
        let last = self.group.tables.len() - 1;
        Ok(&self.group.tables[last])
    }

    /// Append columns to a table.
    pub fn add_columns<I>(&mut self, table: &str, columns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ColumnSpec>,
    {
        let index = self.require_table(table)?;
        let columns = resolve_specs(columns)?;
        append_columns(&mut self.group.tables[index], columns)?;
        self.auto_constraints();
        self.cache.invalidate();
        Ok(())
    }

    /// Remove columns from a table, with the keys that involve them.
    pub fn remove_columns<I, S>(&mut self, table: &str, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = self.require_table(table)?;
        let target = &self.group.tables[index];
        let removed = columns
            .into_iter()
            .map(|locator| target.column(locator.as_ref()).map(|c| c.name.clone()))
            .collect::<Result<HashSet<String>>>()?;
        let url = target.url.clone();
        let intersects = |names: &[String]| names.iter().any(|n| removed.contains(n));

        for (i, t) in self.group.tables.iter_mut().enumerate() {
            t.schema.foreign_keys.retain(|fk| {
                let from_removed = i == index && intersects(&fk.column_reference);
                let to_removed =
                    fk.reference.resource == url && intersects(&fk.reference.column_reference);
                if from_removed || to_removed {
                    debug!(table = %t.url, columns = ?fk.column_reference, "dropping foreign key");
                }
                !(from_removed || to_removed)
            });
        }
        let table = &mut self.group.tables[index];
        if table.primary_key().is_some_and(|pk| intersects(pk)) {
            table.schema.primary_key = None;
        }
        table.schema.columns.retain(|c| !removed.contains(&c.name));
        self.auto_constraints();
        self.cache.invalidate();
        Ok(())
    }

    /// Remove a table and all foreign keys pointing at it.
    pub fn remove_table(&mut self, table: &str) -> Result<Table> {
        let index = self.require_table(table)?;
        let url = self.group.tables[index].url.clone();
        for t in self.group.tables.iter_mut() {
            t.schema
                .foreign_keys
                .retain(|fk| fk.reference.resource != url);
        }
        let removed = self.group.tables.remove(index);
        self.cache.invalidate();
        Ok(removed)
    }

    /// Declare a foreign key.
    ///
    /// Without `target_column`, the key references the primary key of the
    /// target table. Composite keys are not supported.
    pub fn add_foreign_key(
        &mut self,
        source_table: &str,
        source_column: impl Into<Columns>,
        target_table: &str,
        target_column: Option<&str>,
    ) -> Result<()> {
        let source_column = match source_column.into() {
            Columns::One(name) => name,
            Columns::Many(names) => {
                return Err(CldfError::Unsupported(format!(
                    "composite foreign keys are not supported: {:?}",
                    names
                )));
            }
        };
        let source_index = self.require_table(source_table)?;
        let source_name = self.group.tables[source_index]
            .column(&source_column)?
            .name
            .clone();
        let target = self.table(target_table)?;
        let target_name = match target_column {
            Some(locator) => target.column(locator)?.name.clone(),
            None => match target.primary_key() {
                Some([name]) => name.clone(),
                Some(_) => {
                    return Err(CldfError::Unsupported(format!(
                        "foreign key to composite primary key of {}",
                        target.url
                    )));
                }
                None => {
                    return Err(CldfError::Constraint(format!(
                        "{} has no primary key to reference",
                        target.url
                    )));
                }
            },
        };
        let fk = ForeignKey::new(&source_name, &target.url, &target_name);
        let keys = &mut self.group.tables[source_index].schema.foreign_keys;
        if !keys.contains(&fk) {
            keys.push(fk);
        }
        self.cache.invalidate();
        Ok(())
    }

    /// Infer primary and foreign keys from property bindings.
    ///
    /// Tables without a primary key get their `id` column as key. Columns
    /// bound to a reference property get a foreign key to the table of the
    /// referenced component, if the dataset has one and no key starts from
    /// the column yet. Running this repeatedly changes nothing.
    pub fn auto_constraints(&mut self) {
        for table in self.group.tables.iter_mut() {
            if table.primary_key().is_none() {
                if let Some(name) = table.id_column().map(|c| c.name.clone()) {
                    debug!(table = %table.url, column = %name, "setting primary key");
                    table.schema.primary_key = Some(vec![name]);
                }
            }
        }

        let targets: Vec<(&'static str, String, String)> = self
            .group
            .tables
            .iter()
            .filter_map(|t| {
                let kind = t.component_name()?;
                let column = t.reference_target()?;
                Some((kind, t.url.clone(), column.to_string()))
            })
            .collect();

        for table in self.group.tables.iter_mut() {
            let mut new_keys = Vec::new();
            for col in table.columns() {
                let Some(component) = col.term().and_then(|t| t.references.as_deref()) else {
                    continue;
                };
                if table.foreign_keys().iter().any(|fk| fk.is_from(&col.name)) {
                    continue;
                }
                if let Some((_, url, target)) = targets.iter().find(|(k, _, _)| *k == component) {
                    debug!(
                        table = %table.url,
                        column = %col.name,
                        target = %url,
                        "wiring foreign key"
                    );
                    new_keys.push(ForeignKey::new(&col.name, url, target));
                }
            }
            table.schema.foreign_keys.extend(new_keys);
        }
    }

    fn require_table(&self, locator: &str) -> Result<usize> {
        self.table_index(locator)
            .ok_or_else(|| CldfError::TableNotFound {
                locator: locator.to_string(),
            })
    }
}
