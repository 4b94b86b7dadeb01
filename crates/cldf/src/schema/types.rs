//! Core type definitions for column datatypes and cell values.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Base datatype of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseType {
    /// Text values.
    #[default]
    String,
    /// URLs, stored as text.
    AnyUri,
    /// Whole numbers.
    Integer,
    /// Numbers with an optional fractional part.
    Decimal,
    /// Boolean values.
    Boolean,
    /// Date only (no time component).
    Date,
    /// Date and time.
    DateTime,
    /// Structured values serialized as JSON.
    Json,
}

impl BaseType {
    /// The CSVW name of this base type.
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::String => "string",
            BaseType::AnyUri => "anyURI",
            BaseType::Integer => "integer",
            BaseType::Decimal => "decimal",
            BaseType::Boolean => "boolean",
            BaseType::Date => "date",
            BaseType::DateTime => "datetime",
            BaseType::Json => "json",
        }
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, BaseType::Integer | BaseType::Decimal)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // CSVW derived types collapse onto the base they are derived from.
        let base = match s {
            "string" | "normalizedString" | "token" | "language" | "Name" | "NMTOKEN"
            | "xml" | "html" => BaseType::String,
            "anyURI" => BaseType::AnyUri,
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
            | "unsignedInt" | "unsignedShort" | "unsignedByte" => BaseType::Integer,
            "decimal" | "float" | "double" | "number" => BaseType::Decimal,
            "boolean" => BaseType::Boolean,
            "date" => BaseType::Date,
            "datetime" | "dateTime" | "dateTimeStamp" => BaseType::DateTime,
            "json" => BaseType::Json,
            other => return Err(format!("unsupported datatype '{}'", other)),
        };
        Ok(base)
    }
}

/// Datatype of a column: base type plus optional constraints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "DatatypeDef", into = "DatatypeDef")]
pub struct Datatype {
    pub base: BaseType,
    /// Regex for strings, `"true|false"` style pairs for booleans.
    pub format: Option<String>,
    /// Lower bound for numeric values.
    pub minimum: Option<serde_json::Value>,
    /// Upper bound for numeric values.
    pub maximum: Option<serde_json::Value>,
}

impl Datatype {
    /// Create a datatype with no constraints.
    pub fn new(base: BaseType) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    /// Set the format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Numeric value of the minimum, if one is set.
    pub fn min_value(&self) -> Option<f64> {
        self.minimum.as_ref().and_then(bound_value)
    }

    /// Numeric value of the maximum, if one is set.
    pub fn max_value(&self) -> Option<f64> {
        self.maximum.as_ref().and_then(bound_value)
    }
}

/// Bounds may be given as JSON numbers or numeric strings.
fn bound_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Wire form of a datatype: a bare base name or a description object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DatatypeDef {
    Name(String),
    Object {
        #[serde(default)]
        base: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<serde_json::Value>,
    },
}

impl TryFrom<DatatypeDef> for Datatype {
    type Error = String;

    fn try_from(def: DatatypeDef) -> Result<Self, Self::Error> {
        match def {
            DatatypeDef::Name(name) => Ok(Datatype::new(name.parse()?)),
            DatatypeDef::Object {
                base,
                format,
                minimum,
                maximum,
            } => Ok(Datatype {
                base: base.as_deref().unwrap_or("string").parse()?,
                format,
                minimum,
                maximum,
            }),
        }
    }
}

impl From<Datatype> for DatatypeDef {
    fn from(dt: Datatype) -> Self {
        if dt.format.is_none() && dt.minimum.is_none() && dt.maximum.is_none() {
            DatatypeDef::Name(dt.base.as_str().to_string())
        } else {
            DatatypeDef::Object {
                base: Some(dt.base.as_str().to_string()),
                format: dt.format,
                minimum: dt.minimum,
                maximum: dt.maximum,
            }
        }
    }
}

/// A typed cell value. Null cells are represented as `None` in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
    /// Items of a list-valued column.
    List(Vec<Value>),
}

impl Value {
    /// Get the string content, for string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The scalar items of this value: list items, or the value itself.
    pub fn items(&self) -> impl Iterator<Item = &Value> {
        match self {
            Value::List(items) => items.iter().collect::<Vec<_>>().into_iter(),
            other => vec![other].into_iter(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Decimal(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
