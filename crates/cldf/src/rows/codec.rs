//! Conversion between cell text and typed values.
//!
//! The empty string is the null value for every datatype. List-valued cells
//! are split on the column separator literally: there is no escaping, so an
//! item containing the separator does not survive a round trip, and empty
//! items are dropped.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{CldfError, Result};
use crate::schema::{BaseType, Column, Datatype, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Reads and writes the cells of one column.
///
/// Build one per column and reuse it for every row; building compiles the
/// format pattern.
#[derive(Debug, Clone)]
pub struct CellCodec {
    datatype: Datatype,
    separator: Option<String>,
    pattern: Option<Regex>,
    booleans: Option<(String, String)>,
}

impl CellCodec {
    pub fn new(column: &Column) -> Result<Self> {
        let datatype = column.datatype.clone().unwrap_or_default();
        let mut pattern = None;
        let mut booleans = None;
        if let Some(format) = &datatype.format {
            match datatype.base {
                BaseType::String | BaseType::AnyUri => {
                    let anchored = format!("^(?:{})$", format);
                    pattern = Some(Regex::new(&anchored).map_err(|e| CldfError::InvalidValue {
                        value: format.clone(),
                        datatype: "format".to_string(),
                        reason: e.to_string(),
                    })?);
                }
                BaseType::Boolean => {
                    if let Some((yes, no)) = format.split_once('|') {
                        booleans = Some((yes.to_string(), no.to_string()));
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            datatype,
            separator: column.separator.clone(),
            pattern,
            booleans,
        })
    }

    pub fn base(&self) -> BaseType {
        self.datatype.base
    }

    /// Parse cell text. The empty string yields `None`.
    pub fn read(&self, text: &str) -> Result<Option<Value>> {
        if text.is_empty() {
            return Ok(None);
        }
        match &self.separator {
            Some(sep) => {
                let items = text
                    .split(sep.as_str())
                    .filter(|item| !item.is_empty())
                    .map(|item| self.read_scalar(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Value::List(items)))
            }
            None => self.read_scalar(text).map(Some),
        }
    }

    /// Format a value as cell text. `None` yields the empty string.
    pub fn write(&self, value: Option<&Value>) -> Result<String> {
        let Some(value) = value else {
            return Ok(String::new());
        };
        match (value, &self.separator) {
            (Value::List(items), Some(sep)) => {
                let cells = items
                    .iter()
                    .map(|item| self.write_scalar(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(cells.join(sep))
            }
            (Value::List(_), None) => Err(self.invalid(
                &format!("{:?}", value),
                "list value for a column without separator",
            )),
            (scalar, _) => self.write_scalar(scalar),
        }
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> CldfError {
        CldfError::InvalidValue {
            value: value.to_string(),
            datatype: self.datatype.base.to_string(),
            reason: reason.into(),
        }
    }

    fn read_scalar(&self, text: &str) -> Result<Value> {
        let value = match self.datatype.base {
            BaseType::String | BaseType::AnyUri => {
                if let Some(pattern) = &self.pattern {
                    if !pattern.is_match(text) {
                        return Err(self.invalid(
                            text,
                            format!("does not match format '{}'", pattern.as_str()),
                        ));
                    }
                }
                Value::String(text.to_string())
            }
            BaseType::Integer => Value::Integer(
                text.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| self.invalid(text, e.to_string()))?,
            ),
            BaseType::Decimal => Value::Decimal(
                text.trim()
                    .parse()
                    .map_err(|e: std::num::ParseFloatError| self.invalid(text, e.to_string()))?,
            ),
            BaseType::Boolean => Value::Boolean(self.read_bool(text)?),
            BaseType::Date => Value::Date(
                NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                    .map_err(|e| self.invalid(text, e.to_string()))?,
            ),
            BaseType::DateTime => Value::DateTime(
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
                    .ok_or_else(|| self.invalid(text, "not an ISO 8601 datetime"))?,
            ),
            BaseType::Json => Value::Json(
                serde_json::from_str(text).map_err(|e| self.invalid(text, e.to_string()))?,
            ),
        };
        self.check_bounds(text, &value)?;
        Ok(value)
    }

    fn read_bool(&self, text: &str) -> Result<bool> {
        match &self.booleans {
            Some((yes, _)) if text == yes => Ok(true),
            Some((_, no)) if text == no => Ok(false),
            Some((yes, no)) => Err(self.invalid(text, format!("expected '{}' or '{}'", yes, no))),
            None => match text.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(self.invalid(text, "expected 'true' or 'false'")),
            },
        }
    }

    fn check_bounds(&self, text: &str, value: &Value) -> Result<()> {
        let Some(n) = value.as_f64() else {
            return Ok(());
        };
        if let Some(min) = self.datatype.min_value() {
            if n < min {
                return Err(self.invalid(text, format!("less than minimum {}", min)));
            }
        }
        if let Some(max) = self.datatype.max_value() {
            if n > max {
                return Err(self.invalid(text, format!("greater than maximum {}", max)));
            }
        }
        Ok(())
    }

    fn write_scalar(&self, value: &Value) -> Result<String> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(f) => f.to_string(),
            Value::Boolean(b) => match &self.booleans {
                Some((yes, no)) => if *b { yes.clone() } else { no.clone() },
                None => b.to_string(),
            },
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMATS[0]).to_string(),
            Value::Json(v) => serde_json::to_string(v)?,
            Value::List(_) => return Err(self.invalid(&format!("{:?}", value), "nested list")),
        };
        Ok(text)
    }
}

/// Parse one cell of `column`.
pub fn unmarshal(column: &Column, text: &str) -> Result<Option<Value>> {
    CellCodec::new(column)?.read(text)
}

/// Format one cell of `column`.
pub fn marshal(column: &Column, value: Option<&Value>) -> Result<String> {
    CellCodec::new(column)?.write(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(spec: serde_json::Value) -> Column {
        serde_json::from_value(spec).unwrap()
    }

    #[test]
    fn test_empty_is_null_for_every_type() {
        for base in ["string", "integer", "decimal", "boolean", "date", "datetime", "json"] {
            let col = column(json!({"name": "x", "datatype": base}));
            assert_eq!(unmarshal(&col, "").unwrap(), None);
            assert_eq!(marshal(&col, None).unwrap(), "");
        }
    }

    #[test]
    fn test_list_split_and_join() {
        let col = column(json!({"name": "Source", "separator": ";"}));
        let value = unmarshal(&col, "a;b[1-2]").unwrap().unwrap();
        assert_eq!(value, Value::from(vec!["a", "b[1-2]"]));
        assert_eq!(marshal(&col, Some(&value)).unwrap(), "a;b[1-2]");
    }

    #[test]
    fn test_integer_list() {
        let col = column(json!({"name": "n", "datatype": "integer", "separator": " "}));
        assert_eq!(
            unmarshal(&col, "1 2 3").unwrap(),
            Some(Value::from(vec![1, 2, 3]))
        );
    }

    #[test]
    fn test_boolean_format() {
        let col = column(json!({"name": "b", "datatype": {"base": "boolean", "format": "Yes|No"}}));
        assert_eq!(unmarshal(&col, "Yes").unwrap(), Some(Value::Boolean(true)));
        assert_eq!(marshal(&col, Some(&Value::Boolean(false))).unwrap(), "No");
        assert!(unmarshal(&col, "true").is_err());
    }

    #[test]
    fn test_format_is_anchored() {
        let col = column(json!({"name": "id", "datatype": {"base": "string", "format": "[a-z]+"}}));
        assert!(unmarshal(&col, "abc").is_ok());
        assert!(unmarshal(&col, "abc1").is_err());
    }

    #[test]
    fn test_bounds() {
        let col = column(json!({"name": "lat", "datatype": {"base": "decimal", "minimum": "-90", "maximum": "90"}}));
        assert!(unmarshal(&col, "45.5").is_ok());
        let err = unmarshal(&col, "91").unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn test_dates() {
        let col = column(json!({"name": "d", "datatype": "date"}));
        let value = unmarshal(&col, "2020-02-29").unwrap();
        assert_eq!(marshal(&col, value.as_ref()).unwrap(), "2020-02-29");
        assert!(unmarshal(&col, "2021-02-29").is_err());

        let col = column(json!({"name": "t", "datatype": "datetime"}));
        assert!(unmarshal(&col, "2020-01-01T10:00:00").unwrap().is_some());
    }

    #[test]
    fn test_json_cells() {
        let col = column(json!({"name": "j", "datatype": "json"}));
        let value = unmarshal(&col, r#"{"a": [1, 2]}"#).unwrap().unwrap();
        assert_eq!(value, Value::Json(json!({"a": [1, 2]})));
        assert_eq!(marshal(&col, Some(&value)).unwrap(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_list_without_separator_fails() {
        let col = Column::new("x");
        assert!(marshal(&col, Some(&Value::from(vec!["a"]))).is_err());
    }
}
