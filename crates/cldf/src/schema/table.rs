//! Table-level schema definition.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CldfError, Result};
use crate::terms::{TERMS, term_uri};

use super::column::Column;

/// Property holding a table's (or dataset's) conformance URI.
pub const CONFORMS_TO: &str = "dc:conformsTo";

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(OneOrMany::deserialize(deserializer)?.into())
}

fn optional_one_or_many<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error> {
    let names: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(names.map(Vec::from).filter(|v| !v.is_empty()))
}

/// Target side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyReference {
    /// Url of the referenced table.
    pub resource: String,
    #[serde(deserialize_with = "one_or_many")]
    pub column_reference: Vec<String>,
}

/// A foreign key constraint, owned by the referencing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Names of the referencing columns.
    #[serde(deserialize_with = "one_or_many")]
    pub column_reference: Vec<String>,
    pub reference: ForeignKeyReference,
}

impl ForeignKey {
    /// A single-column foreign key.
    pub fn new(column: &str, resource: &str, target_column: &str) -> Self {
        Self {
            column_reference: vec![column.to_string()],
            reference: ForeignKeyReference {
                resource: resource.to_string(),
                column_reference: vec![target_column.to_string()],
            },
        }
    }

    pub fn is_composite(&self) -> bool {
        self.column_reference.len() > 1
    }

    /// Whether this key starts from exactly the given column.
    pub fn is_from(&self, column: &str) -> bool {
        self.column_reference.len() == 1 && self.column_reference[0] == column
    }
}

/// Columns and keys of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Columns in file order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Names of the primary key columns.
    #[serde(
        default,
        deserialize_with = "optional_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub primary_key: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(flatten)]
    pub properties: IndexMap<String, serde_json::Value>,
}

/// Schema of one table of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// File name of the table, relative to the metadata file.
    pub url: String,
    #[serde(rename = "tableSchema", default)]
    pub schema: TableSchema,
    /// Common properties, including `dc:conformsTo`.
    #[serde(flatten)]
    pub properties: IndexMap<String, serde_json::Value>,
}

impl Table {
    /// Create an empty table.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            schema: TableSchema::default(),
            properties: IndexMap::new(),
        }
    }

    /// The conformance URI, if declared.
    pub fn conforms_to(&self) -> Option<&str> {
        self.properties.get(CONFORMS_TO).and_then(|v| v.as_str())
    }

    pub fn set_conforms_to(&mut self, uri: impl Into<String>) {
        self.properties
            .insert(CONFORMS_TO.to_string(), serde_json::Value::String(uri.into()));
    }

    /// The component this table conforms to.
    ///
    /// `Ok(None)` means the table declares no CLDF conformance. A URI within
    /// the CLDF namespace that is not a known term is an error, as is a known
    /// term that is not a component.
    pub fn table_type(&self) -> Result<Option<&'static str>> {
        let Some(uri) = self.conforms_to() else {
            return Ok(None);
        };
        match TERMS.lookup_by_uri(uri)? {
            Some(term) if term.is_component() => Ok(Some(term.name.as_str())),
            Some(_) => Err(CldfError::InvalidConformance(uri.to_string())),
            None => Ok(None),
        }
    }

    /// Like [`Table::table_type`], treating malformed conformance as none.
    pub fn component_name(&self) -> Option<&'static str> {
        self.table_type().ok().flatten()
    }

    /// Whether `locator` addresses this table: its url, or the name or URI
    /// of the component it conforms to.
    pub fn matches(&self, locator: &str) -> bool {
        if self.url == locator {
            return true;
        }
        match (self.conforms_to(), TERMS.resolve(locator)) {
            (Some(uri), Some(term)) => term.is_component() && uri == term.uri(),
            _ => false,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.schema.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column. An exact name match wins over a property match.
    pub fn column_index(&self, locator: &str) -> Option<usize> {
        self.schema
            .columns
            .iter()
            .position(|c| c.name == locator)
            .or_else(|| {
                self.schema
                    .columns
                    .iter()
                    .position(|c| c.is_bound_to(locator))
            })
    }

    /// Get a column by name, property URI or property term name.
    pub fn get_column(&self, locator: &str) -> Option<&Column> {
        self.column_index(locator).map(|i| &self.schema.columns[i])
    }

    /// Like [`Table::get_column`], failing with an error naming the table.
    pub fn column(&self, locator: &str) -> Result<&Column> {
        self.get_column(locator)
            .ok_or_else(|| CldfError::ColumnNotFound {
                locator: locator.to_string(),
                table: self.url.clone(),
            })
    }

    pub fn column_mut(&mut self, locator: &str) -> Result<&mut Column> {
        match self.column_index(locator) {
            Some(i) => Ok(&mut self.schema.columns[i]),
            None => Err(CldfError::ColumnNotFound {
                locator: locator.to_string(),
                table: self.url.clone(),
            }),
        }
    }

    /// The column bound to the `id` property.
    pub fn id_column(&self) -> Option<&Column> {
        let uri = term_uri("id");
        self.schema
            .columns
            .iter()
            .find(|c| c.property_url.as_deref() == Some(uri.as_str()))
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.schema.primary_key.as_deref()
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.schema.foreign_keys
    }

    /// The single column a reference to this table should target: the
    /// `id`-bound column, or else a single-column primary key.
    pub fn reference_target(&self) -> Option<&str> {
        if let Some(col) = self.id_column() {
            return Some(col.name.as_str());
        }
        match self.primary_key() {
            Some([name]) => Some(name.as_str()),
            _ => None,
        }
    }
}
