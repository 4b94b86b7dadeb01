//! Canned table definitions for the CLDF components.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::{CldfError, Result};
use crate::schema::Table;
use crate::terms::TERMS;

const COMPONENT_DEFINITIONS: &str = include_str!("../../data/components.json");

static COMPONENTS: Lazy<IndexMap<String, Table>> = Lazy::new(|| {
    load(COMPONENT_DEFINITIONS).expect("embedded component definitions are valid")
});

fn load(json: &str) -> Result<IndexMap<String, Table>> {
    let tables: Vec<Table> = serde_json::from_str(json)?;
    tables
        .into_iter()
        .map(|table| match table.table_type()? {
            Some(name) => Ok((name.to_string(), table)),
            None => Err(CldfError::Metadata(format!(
                "component template {} has no component type",
                table.url
            ))),
        })
        .collect()
}

/// A fresh copy of the template of a component, given by name or URI.
pub fn template(component: &str) -> Result<Table> {
    let name = TERMS
        .resolve(component)
        .filter(|t| t.is_component())
        .map(|t| t.name.as_str())
        .unwrap_or(component);
    COMPONENTS
        .get(name)
        .cloned()
        .ok_or_else(|| CldfError::UnknownComponent(component.to_string()))
}

/// Names of the components that have a template.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMPONENTS.keys().map(String::as_str)
}
