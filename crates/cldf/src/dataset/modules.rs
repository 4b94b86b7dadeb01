//! Registry of dataset modules (Generic, Wordlist, StructureDataset, ...).
//!
//! The registry is built from the embedded definitions on first use and can
//! be rebuilt with [`reload`]. Lookups hand out shared snapshots, so a reload
//! never invalidates a module a caller already holds.

use std::path::Path;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CldfError, Result};
use crate::schema::{CONFORMS_TO, TableGroup};
use crate::terms::{TERMS, term_uri};

use super::components;

const MODULE_DEFINITIONS: &str = include_str!("../../data/modules.json");

/// The module assumed for datasets that declare none.
pub const DEFAULT_MODULE: &str = "Generic";

#[derive(Deserialize)]
struct ModuleDef {
    #[serde(rename = "dc:conformsTo")]
    conforms_to: String,
    tables: Vec<String>,
}

/// A dataset profile: which components a dataset of this kind must have.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Conformance URI of the module.
    pub uri: String,
    /// Components required by the module, primary table first.
    pub components: Vec<String>,
    /// Metadata template with one table per required component.
    pub template: TableGroup,
}

impl Module {
    fn from_def(def: ModuleDef) -> Result<Self> {
        match TERMS.lookup_by_uri(&def.conforms_to)? {
            Some(term) if term.is_module() => {}
            _ => return Err(CldfError::InvalidConformance(def.conforms_to)),
        }
        let mut template = TableGroup::default();
        template.set_conforms_to(def.conforms_to.clone());
        for component in &def.tables {
            template.tables.push(components::template(component)?);
        }
        Ok(Self {
            uri: def.conforms_to,
            components: def.tables,
            template,
        })
    }

    /// Local name of the module, e.g. `Wordlist`.
    pub fn id(&self) -> &str {
        self.uri.rsplit('#').next().unwrap_or(&self.uri)
    }

    /// The component holding the module's core data.
    pub fn primary_table(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }

    /// File name of the primary table.
    pub fn fname(&self) -> Option<&str> {
        self.template.tables.first().map(|t| t.url.as_str())
    }

    /// Whether a metadata document declares this module.
    pub fn matches_group(&self, group: &TableGroup) -> bool {
        group.conforms_to() == Some(self.uri.as_str())
    }

    /// Whether a data file is the primary table file of this module.
    pub fn matches_file(&self, path: &Path) -> bool {
        match (path.file_name().and_then(|n| n.to_str()), self.fname()) {
            (Some(name), Some(fname)) => name == fname,
            _ => false,
        }
    }
}

fn load() -> Result<Vec<Module>> {
    let defs: Vec<ModuleDef> = serde_json::from_str(MODULE_DEFINITIONS)?;
    defs.into_iter().map(Module::from_def).collect()
}

static REGISTRY: Lazy<RwLock<Arc<Vec<Module>>>> = Lazy::new(|| {
    RwLock::new(Arc::new(
        load().expect("embedded module definitions are valid"),
    ))
});

/// All known modules.
pub fn all() -> Arc<Vec<Module>> {
    match REGISTRY.read() {
        Ok(guard) => Arc::clone(&*guard),
        Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
    }
}

/// Look up a module by local name or URI.
pub fn get(id_or_uri: &str) -> Option<Module> {
    let uri = term_uri(id_or_uri);
    all().iter().find(|m| m.uri == uri).cloned()
}

/// The module a metadata document declares, if it is a known one.
pub fn for_group(group: &TableGroup) -> Option<Module> {
    all().iter().find(|m| m.matches_group(group)).cloned()
}

/// The module whose primary table file is `path`.
pub fn for_file(path: &Path) -> Option<Module> {
    all().iter().find(|m| m.matches_file(path)).cloned()
}

/// Rebuild the registry from its definitions. Returns the number of modules.
pub fn reload() -> Result<usize> {
    let modules = load()?;
    let count = modules.len();
    let mut guard = match REGISTRY.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Arc::new(modules);
    debug!(modules = count, "reloaded module registry");
    Ok(count)
}

/// Local name of the module term `group` declares, known to the registry or not.
pub(crate) fn declared_module(group: &TableGroup) -> Option<String> {
    let uri = group.properties.get(CONFORMS_TO)?.as_str()?;
    TERMS
        .lookup_by_uri(uri)
        .ok()
        .flatten()
        .filter(|t| t.is_module())
        .map(|t| t.name.clone())
}
