//! Column schema definition and column specs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CldfError, Result};
use crate::terms::{TERMS, Term, term_uri};

use super::types::{BaseType, Datatype};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name, as used in the header of the table file.
    pub name: String,
    /// URI of the ontology property this column is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_url: Option<String>,
    /// Datatype; `None` means plain strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Datatype>,
    /// Separator of list-valued cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Whether every row must have a value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// URI template for values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_url: Option<String>,
    /// Other annotations (`dc:description`, `dc:isRequiredBy`, ...).
    #[serde(flatten)]
    pub properties: IndexMap<String, serde_json::Value>,
}

impl Column {
    /// Create a plain column with no datatype or binding.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_url: None,
            datatype: None,
            separator: None,
            required: false,
            value_url: None,
            properties: IndexMap::new(),
        }
    }

    /// Set the datatype.
    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = Some(datatype);
        self
    }

    /// Set the list separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Bind the column to a property, given by URI or term name.
    pub fn with_property(mut self, property: &str) -> Self {
        self.property_url = Some(term_uri(property));
        self
    }

    /// Mark the column as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Base type of the column's datatype.
    pub fn base_type(&self) -> BaseType {
        self.datatype.as_ref().map(|dt| dt.base).unwrap_or_default()
    }

    /// Whether cells hold lists.
    pub fn is_list(&self) -> bool {
        self.separator.is_some()
    }

    /// The ontology term this column is bound to, if it is a known term.
    pub fn term(&self) -> Option<&'static Term> {
        let uri = self.property_url.as_deref()?;
        TERMS.lookup_by_uri(uri).ok().flatten()
    }

    /// Whether the column is bound to the property named by `locator`
    /// (a full URI or a term name).
    pub fn is_bound_to(&self, locator: &str) -> bool {
        match &self.property_url {
            Some(uri) => uri == locator || (TERMS.contains(locator) && *uri == term_uri(locator)),
            None => false,
        }
    }

    /// Whether a module template requires this column, directly or because
    /// other components depend on it.
    pub fn is_required_by_template(&self) -> bool {
        self.required
            || self
                .properties
                .get("dc:isRequiredBy")
                .is_some_and(|v| !v.is_null())
    }
}

/// The accepted ways of describing a column to add.
#[derive(Debug, Clone)]
pub enum ColumnSpec {
    /// A column name, or the URI of a property term.
    Name(String),
    /// A column description in metadata JSON form.
    Value(serde_json::Value),
    /// An already constructed column, used as is.
    Column(Column),
}

impl From<&str> for ColumnSpec {
    fn from(s: &str) -> Self {
        ColumnSpec::Name(s.to_string())
    }
}

impl From<String> for ColumnSpec {
    fn from(s: String) -> Self {
        ColumnSpec::Name(s)
    }
}

impl From<Column> for ColumnSpec {
    fn from(c: Column) -> Self {
        ColumnSpec::Column(c)
    }
}

impl From<serde_json::Value> for ColumnSpec {
    fn from(v: serde_json::Value) -> Self {
        ColumnSpec::Value(v)
    }
}

/// Turn a column spec into a column.
///
/// A property URI yields the term's default column, any other name a plain
/// string column. JSON values must be objects describing a column (or strings,
/// treated like names).
pub fn resolve_column_spec(spec: impl Into<ColumnSpec>) -> Result<Column> {
    match spec.into() {
        ColumnSpec::Name(name) => Ok(column_from_name(&name)),
        ColumnSpec::Column(column) => Ok(column),
        ColumnSpec::Value(serde_json::Value::String(name)) => Ok(column_from_name(&name)),
        ColumnSpec::Value(value @ serde_json::Value::Object(_)) => {
            serde_json::from_value(value.clone())
                .map_err(|e| CldfError::InvalidColumnSpec(format!("{}: {}", value, e)))
        }
        ColumnSpec::Value(other) => Err(CldfError::InvalidColumnSpec(other.to_string())),
    }
}

fn column_from_name(name: &str) -> Column {
    if name.contains("://") {
        if let Some(term) = TERMS.resolve(name) {
            return term.to_column();
        }
    }
    Column::new(name).with_datatype(Datatype::new(BaseType::String))
}
