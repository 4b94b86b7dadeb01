//! The metadata document: a group of tables plus dataset-level properties.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CldfError, Result};
use crate::rows::Dialect;

use super::table::{CONFORMS_TO, Table};

fn default_context() -> serde_json::Value {
    serde_json::Value::String("http://www.w3.org/ns/csvw".to_string())
}

/// A CSVW table group as stored in a `*-metadata.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGroup {
    #[serde(rename = "@context", default = "default_context")]
    pub context: serde_json::Value,
    /// Dataset-level common properties (`dc:conformsTo`, `dc:source`, ...).
    #[serde(flatten)]
    pub properties: IndexMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Default for TableGroup {
    fn default() -> Self {
        Self {
            context: default_context(),
            properties: IndexMap::new(),
            dialect: None,
            tables: Vec::new(),
        }
    }
}

impl TableGroup {
    /// Read a metadata document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CldfError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(CldfError::Metadata(
                "metadata must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Write the document as pretty-printed JSON.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| CldfError::io(path, e))
    }

    /// The dataset conformance URI, if declared.
    pub fn conforms_to(&self) -> Option<&str> {
        self.properties.get(CONFORMS_TO).and_then(|v| v.as_str())
    }

    pub fn set_conforms_to(&mut self, uri: impl Into<String>) {
        self.properties
            .insert(CONFORMS_TO.to_string(), serde_json::Value::String(uri.into()));
    }

    /// The dialect in effect, falling back to the defaults.
    pub fn dialect(&self) -> Dialect {
        self.dialect.clone().unwrap_or_default()
    }

    pub fn table(&self, url: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.url == url)
    }
}
