//! The bibliography of a dataset and resolution of row citations.
//!
//! Rows cite sources as `key` or `key[context]`. Two resolution modes exist:
//!
//! - [`Sources::validate`] fails on any key missing from the bibliography.
//! - [`Sources::expand_refs`] additionally accepts purely numeric keys
//!   (catalog identifiers such as Glottolog reference ids), adding a `misc`
//!   placeholder record for each one it has not seen before.

mod bibtex;
mod reference;

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{CldfError, Result};

pub use bibtex::{Source, parse as parse_bibtex};
pub use reference::Reference;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-]+$").expect("valid key pattern"));

static CATALOG_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]*$").expect("valid catalog key pattern"));

/// Whether `key` is a purely numeric catalog identifier.
pub fn is_catalog_key(key: &str) -> bool {
    CATALOG_KEY_PATTERN.is_match(key)
}

/// A keyed collection of bibliography records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sources {
    entries: IndexMap<String, Source>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a BibTeX file. A missing file yields an empty collection.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut sources = Self::new();
        if path.exists() {
            sources.read(path)?;
        }
        Ok(sources)
    }

    /// Add the records of a BibTeX file.
    pub fn read(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| CldfError::io(path, e))?;
        self.add_bibtex(&text)
    }

    /// Add the records of BibTeX text.
    pub fn add_bibtex(&mut self, text: &str) -> Result<()> {
        for source in bibtex::parse(text)? {
            self.add(source)?;
        }
        Ok(())
    }

    /// Add a record. A record whose key is already present is ignored.
    pub fn add(&mut self, source: Source) -> Result<()> {
        if !KEY_PATTERN.is_match(&source.id) {
            return Err(CldfError::InvalidReference(format!(
                "invalid source ID: {}",
                source.id
            )));
        }
        if !self.entries.contains_key(&source.id) {
            self.entries.insert(source.id.clone(), source);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a record, failing for unknown keys.
    pub fn get(&self, key: &str) -> Result<&Source> {
        self.entries
            .get(key)
            .ok_or_else(|| CldfError::MissingSource(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.entries.values()
    }

    /// Check that every citation resolves to a known record.
    pub fn validate<S: AsRef<str>>(&self, refs: &[S]) -> Result<()> {
        for r in refs {
            let (key, _) = Reference::parse(r.as_ref())?;
            if !self.contains(&key) {
                return Err(CldfError::MissingSource(key));
            }
        }
        Ok(())
    }

    /// Resolve citations, adding placeholder records for unknown catalog keys.
    ///
    /// Placeholders are added only once every citation has resolved; on
    /// error the collection is unchanged.
    pub fn expand_refs<S: AsRef<str>>(&mut self, refs: &[S]) -> Result<Vec<Reference>> {
        let mut expanded = Vec::with_capacity(refs.len());
        for r in refs {
            let (key, context) = Reference::parse(r.as_ref())?;
            if !self.contains(&key) && !is_catalog_key(&key) {
                return Err(CldfError::MissingSource(key));
            }
            expanded.push(Reference::new(key, context)?);
        }
        for reference in &expanded {
            let key = &reference.source;
            if !self.contains(key) {
                debug!(key = %key, "adding placeholder source for catalog id");
                self.add(Source::new("misc", key.clone()).with_field("glottolog_id", key.clone()))?;
            }
        }
        Ok(expanded)
    }

    /// Write the collection (or only the records in `ids`) as BibTeX.
    ///
    /// Nothing is written when there is nothing to write; the path is
    /// returned otherwise.
    pub fn write(&self, path: impl AsRef<Path>, ids: Option<&[&str]>) -> Result<Option<PathBuf>> {
        let path = path.as_ref();
        let selected: Vec<&Source> = self
            .entries
            .values()
            .filter(|s| ids.is_none_or(|ids| ids.contains(&s.id.as_str())))
            .collect();
        if selected.is_empty() {
            return Ok(None);
        }
        let text: String = selected
            .iter()
            .map(|s| s.to_bibtex())
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(path, text).map_err(|e| CldfError::io(path, e))?;
        info!(path = %path.display(), sources = selected.len(), "wrote bibliography");
        Ok(Some(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> Sources {
        let mut sources = Sources::new();
        sources
            .add_bibtex("@book{Meier2005, title={Title}}\n@misc{Other, note={x}}")
            .unwrap();
        sources
    }

    #[test]
    fn test_validate_reports_missing_key() {
        let sources = sources();
        sources.validate(&["Meier2005[1-20]"]).unwrap();
        let err = sources.validate(&["Meier2005", "key[1-20]"]).unwrap_err();
        match err {
            CldfError::MissingSource(key) => assert_eq!(key, "key"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_catalog_keys_expand_but_do_not_validate() {
        let mut sources = sources();
        assert!(sources.validate(&["12345"]).is_err());

        let refs = sources.expand_refs(&["12345[3]", "Meier2005"]).unwrap();
        assert_eq!(refs[0].to_string(), "12345[3]");
        assert_eq!(sources.get("12345").unwrap().get("glottolog_id"), Some("12345"));

        assert!(sources.expand_refs(&["01234"]).is_err());
        assert!(sources.expand_refs(&["unknown"]).is_err());
    }

    #[test]
    fn test_failed_expansion_adds_nothing() {
        let mut sources = sources();
        assert!(sources.expand_refs(&["12345", "unknown"]).is_err());
        assert!(sources.expand_refs(&["678", "Meier2005[1[2]"]).is_err());
        assert!(!sources.contains("12345"));
        assert!(!sources.contains("678"));
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut sources = Sources::new();
        assert!(sources.add(Source::new("misc", "a b")).is_err());
        assert!(sources.is_empty());
    }

    #[test]
    fn test_duplicate_keys_ignored() {
        let mut sources = sources();
        sources
            .add(Source::new("misc", "Meier2005").with_field("title", "Other"))
            .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources.get("Meier2005").unwrap().get("title"), Some("Title"));
    }

    #[test]
    fn test_write_selected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.bib");
        let sources = sources();
        assert!(sources.write(&path, Some(&["Other"][..])).unwrap().is_some());
        let reread = Sources::from_file(&path).unwrap();
        assert_eq!(reread.keys().collect::<Vec<_>>(), vec!["Other"]);

        assert!(Sources::new().write(&path, None).unwrap().is_none());
        assert!(Sources::from_file(dir.path().join("missing.bib")).unwrap().is_empty());
    }
}
