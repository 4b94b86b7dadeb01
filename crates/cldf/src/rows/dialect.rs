//! CSV dialect configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CldfError, Result};

/// How table files are delimited and quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dialect {
    /// Field delimiter.
    pub delimiter: char,
    /// Quote character.
    pub quote_char: char,
    /// Whether files start with a header row.
    pub header: bool,
    /// Whether to strip surrounding whitespace from cells.
    pub trim: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            header: true,
            trim: false,
        }
    }
}

fn ascii_byte(c: char, what: &str) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(CldfError::Metadata(format!(
            "{} must be a single ASCII character, got '{}'",
            what, c
        )))
    }
}

impl Dialect {
    pub fn tab_separated() -> Self {
        Self {
            delimiter: '\t',
            ..Default::default()
        }
    }

    pub(crate) fn reader_builder(&self) -> Result<csv::ReaderBuilder> {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(ascii_byte(self.delimiter, "delimiter")?)
            .quote(ascii_byte(self.quote_char, "quoteChar")?)
            .has_headers(false)
            .flexible(true)
            .trim(if self.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            });
        Ok(builder)
    }

    pub(crate) fn writer_builder(&self) -> Result<csv::WriterBuilder> {
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(ascii_byte(self.delimiter, "delimiter")?)
            .quote(ascii_byte(self.quote_char, "quoteChar")?);
        Ok(builder)
    }
}
