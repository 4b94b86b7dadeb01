//! The CLDF ontology: classes (components and modules) and properties.
//!
//! Terms are loaded once from the embedded definitions and never mutated, so
//! the registry can be read from any thread without synchronisation.
//!
//! # Example
//!
//! ```
//! use cldf::terms::{TERMS, term_uri};
//!
//! let term = TERMS.get("languageReference").unwrap();
//! assert_eq!(term.references.as_deref(), Some("LanguageTable"));
//! assert!(TERMS.lookup_by_uri(&term_uri("glottocode")).unwrap().is_some());
//! ```

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{CldfError, Result};
use crate::schema::{Column, Datatype};

/// Namespace of all CLDF term URIs.
pub const NAMESPACE: &str = "http://cldf.clld.org/v1.0/terms.rdf";

/// Authority (host) shared by every CLDF URI, whatever the version.
pub const AUTHORITY: &str = "cldf.clld.org";

const TERM_DEFINITIONS: &str = include_str!("../data/terms.json");

/// The process-wide term registry.
pub static TERMS: Lazy<Terms> = Lazy::new(|| {
    Terms::from_json(TERM_DEFINITIONS).expect("embedded term definitions are valid")
});

/// Build the full URI for a term name. Full URIs are returned unchanged.
pub fn term_uri(name: &str) -> String {
    if name.starts_with(NAMESPACE) {
        name.to_string()
    } else {
        format!("{}#{}", NAMESPACE, name)
    }
}

/// Extract the authority part of a URI (`scheme://authority/...`).
fn authority(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("://")?;
    let end = rest.find(['/', '#', '?']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Whether a term describes a class or a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Class,
    Property,
}

/// Role of a class term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassType {
    /// A table type, e.g. `LanguageTable`.
    Component,
    /// A dataset profile, e.g. `Wordlist`.
    Module,
}

/// Number of values a property admits per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "singlevalued")]
    Single,
    #[serde(rename = "multivalued")]
    Multi,
}

/// A term of the CLDF ontology.
#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    /// Local name, e.g. `glottocode`.
    pub name: String,
    pub kind: TermKind,
    /// Set for classes only.
    #[serde(default)]
    pub subtype: Option<ClassType>,
    pub label: String,
    /// Default column name for a column bound to this property.
    #[serde(default)]
    pub column: Option<String>,
    /// Expected datatype of values.
    #[serde(default)]
    pub datatype: Option<Datatype>,
    /// List separator for multivalued properties.
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub cardinality: Option<Cardinality>,
    /// Component a reference property points to.
    #[serde(default)]
    pub references: Option<String>,
}

impl Term {
    /// The full URI of the term.
    pub fn uri(&self) -> String {
        term_uri(&self.name)
    }

    pub fn is_component(&self) -> bool {
        self.kind == TermKind::Class && self.subtype == Some(ClassType::Component)
    }

    pub fn is_module(&self) -> bool {
        self.kind == TermKind::Class && self.subtype == Some(ClassType::Module)
    }

    /// A column bound to this property with the default name, datatype and
    /// separator.
    pub fn to_column(&self) -> Column {
        let mut column = Column::new(self.column.as_deref().unwrap_or(&self.label));
        column.property_url = Some(self.uri());
        column.datatype = Some(self.datatype.clone().unwrap_or_default());
        column.separator = self.separator.clone();
        column
    }
}

/// Registry of CLDF terms, indexed by local name and URI.
#[derive(Debug, Clone)]
pub struct Terms {
    /// Terms indexed by local name, in definition order.
    by_name: IndexMap<String, Term>,
    /// Local names indexed by URI.
    by_uri: HashMap<String, String>,
}

impl Terms {
    /// Load a registry from a JSON array of term definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let terms: Vec<Term> = serde_json::from_str(json)?;
        let mut by_name = IndexMap::new();
        let mut by_uri = HashMap::new();
        for term in terms {
            by_uri.insert(term.uri(), term.name.clone());
            by_name.insert(term.name.clone(), term);
        }
        Ok(Self { by_name, by_uri })
    }

    /// Look up a term by local name.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Look up a term by URI.
    ///
    /// URIs outside the CLDF authority are not a CLDF concern and yield
    /// `Ok(None)`. A URI under the CLDF authority that no term matches is an
    /// error, since it usually means a typo or an outdated registry.
    pub fn lookup_by_uri(&self, uri: &str) -> Result<Option<&Term>> {
        if let Some(name) = self.by_uri.get(uri) {
            return Ok(self.by_name.get(name));
        }
        if authority(uri) == Some(AUTHORITY) {
            return Err(CldfError::UnknownTerm(uri.to_string()));
        }
        Ok(None)
    }

    /// Whether `uri` is a known CLDF term URI; errors like `lookup_by_uri`.
    pub fn is_cldf_uri(&self, uri: &str) -> Result<bool> {
        Ok(self.lookup_by_uri(uri)?.is_some())
    }

    /// Resolve a term from either a full URI or a local name.
    pub fn resolve(&self, locator: &str) -> Option<&Term> {
        if locator.contains("://") {
            self.by_uri.get(locator).and_then(|name| self.by_name.get(name))
        } else {
            self.get(locator)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.by_name.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &Term> {
        self.iter().filter(|t| t.kind == TermKind::Property)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Term> {
        self.iter().filter(|t| t.kind == TermKind::Class)
    }

    /// Class terms that name table components.
    pub fn components(&self) -> impl Iterator<Item = &Term> {
        self.iter().filter(|t| t.is_component())
    }

    /// Class terms that name dataset modules.
    pub fn modules(&self) -> impl Iterator<Item = &Term> {
        self.iter().filter(|t| t.is_module())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
