use indexmap::IndexMap;

use crate::schema::Value;

/// One row of a table: column name to typed value, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: IndexMap<String, Option<Value>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cells.insert(name.into(), Some(value.into()));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.cells.insert(name.into(), value);
    }

    /// The value of a cell; `None` for null and for absent cells alike.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cells.get(name).and_then(|v| v.as_ref())
    }

    /// String content of a cell, if it holds a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<Value>)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Option<Value>)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
