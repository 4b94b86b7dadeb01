use std::fmt;

use crate::error::{CldfError, Result};

/// A citation of a source from a row: key plus optional context such as
/// page numbers, written `key` or `key[context]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub source: String,
    pub description: Option<String>,
}

impl Reference {
    pub fn new(source: impl Into<String>, description: Option<String>) -> Result<Self> {
        if let Some(desc) = &description {
            if desc.contains(['[', ']', ';']) {
                return Err(CldfError::InvalidReference(format!(
                    "invalid ref description: {}",
                    desc
                )));
            }
        }
        Ok(Self {
            source: source.into(),
            description,
        })
    }

    /// Split a citation string into key and context.
    pub fn parse(text: &str) -> Result<(String, Option<String>)> {
        let text = text.trim();
        let Some((key, rest)) = text.split_once('[') else {
            return Ok((text.to_string(), None));
        };
        let key = key.trim();
        let rest = rest.trim();
        let Some(context) = rest.strip_suffix(']') else {
            return Err(CldfError::InvalidReference(text.to_string()));
        };
        if key.is_empty() {
            return Err(CldfError::InvalidReference(text.to_string()));
        }
        let context = context.trim();
        let context = (!context.is_empty()).then(|| context.to_string());
        Ok((key.to_string(), context))
    }
}

impl std::str::FromStr for Reference {
    type Err = CldfError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, context) = Reference::parse(s)?;
        Reference::new(key, context)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{}[{}]", self.source, desc),
            None => f.write_str(&self.source),
        }
    }
}
