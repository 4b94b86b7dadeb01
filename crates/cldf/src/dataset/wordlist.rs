//! Segment access for wordlists: forms, cognates and segment slices.

use crate::error::{CldfError, Result};
use crate::rows::Row;
use crate::schema::Value;

use super::Dataset;

fn invalid_slice(spec: &str, reason: &str) -> CldfError {
    CldfError::InvalidValue {
        value: spec.to_string(),
        datatype: "segment slice".to_string(),
        reason: reason.to_string(),
    }
}

fn parse_index(spec: &str, part: &str) -> Result<usize> {
    part.trim()
        .parse()
        .map_err(|_| invalid_slice(spec, "not a positive integer"))
}

/// Concatenate 1-based, inclusive slices of `items`.
///
/// A slice is written `i` (one item) or `i:j` (items `i` to `j`). Ranges
/// reaching past the end are cut short.
pub fn multislice<T: Clone, S: AsRef<str>>(items: &[T], slices: &[S]) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for spec in slices {
        let spec = spec.as_ref();
        let (start, end) = match spec.split_once(':') {
            Some((a, b)) => (parse_index(spec, a)?, parse_index(spec, b)?),
            None => {
                let i = parse_index(spec, spec)?;
                (i, i)
            }
        };
        if start == 0 {
            return Err(invalid_slice(spec, "slices are 1-based"));
        }
        let end = end.min(items.len());
        if start <= end {
            out.extend_from_slice(&items[start - 1..end]);
        }
    }
    Ok(out)
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .map(|v| {
            v.items()
                .filter_map(Value::as_str)
                .flat_map(str::split_whitespace)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Dataset {
    /// The segments of a row of the form table.
    pub fn segments(&self, form: &Row) -> Result<Vec<String>> {
        let names = self.column_names();
        let column = names.get("FormTable", "segments")?;
        Ok(strings(form.get(column)))
    }

    /// The segments of the form a cognate judgement refers to, restricted to
    /// the judgement's segment slices (all segments when it has none).
    pub fn get_subsequence(&self, cognate: &Row) -> Result<Vec<String>> {
        let names = self.column_names();
        let form_column = names.get("CognateTable", "formReference")?;
        let form_id = cognate
            .get(form_column)
            .and_then(Value::as_str)
            .ok_or_else(|| CldfError::InvalidValue {
                value: String::new(),
                datatype: form_column.to_string(),
                reason: "cognate judgement without form".to_string(),
            })?;
        let form = self
            .get_row("FormTable", form_id)?
            .ok_or_else(|| CldfError::InvalidReference(format!("no form {}", form_id)))?;
        let segments = self.segments(&form)?;

        let slices = match names.get("CognateTable", "segmentSlice") {
            Ok(column) => strings(cognate.get(column)),
            Err(_) => Vec::new(),
        };
        if slices.is_empty() {
            return Ok(segments);
        }
        multislice(&segments, &slices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multislice() {
        let items = ["a", "b", "c", "d"];
        assert_eq!(multislice(&items, &["2:3"]).unwrap(), vec!["b", "c"]);
        assert_eq!(multislice(&items, &["1", "4"]).unwrap(), vec!["a", "d"]);
        assert_eq!(multislice(&items, &["3:9"]).unwrap(), vec!["c", "d"]);
        assert!(multislice(&items, &["0:1"]).is_err());
        assert!(multislice(&items, &["x"]).is_err());
    }

    #[test]
    fn test_subsequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = Dataset::in_dir(dir.path(), "Wordlist", false).unwrap();
        ds.add_component("CognateTable", Vec::<&str>::new()).unwrap();
        let forms = vec![Row::new()
            .with("ID", "f1")
            .with("Language_ID", "l")
            .with("Parameter_ID", "p")
            .with("Form", "abcd")
            .with("Segments", vec!["a", "b", "c", "d"])];
        let cognate = Row::new()
            .with("ID", "c1")
            .with("Form_ID", "f1")
            .with("Cognateset_ID", "s")
            .with("Segment_Slice", vec!["2:3"]);
        ds.write([("FormTable", forms)]).unwrap();

        assert_eq!(ds.get_subsequence(&cognate).unwrap(), vec!["b", "c"]);
    }
}
