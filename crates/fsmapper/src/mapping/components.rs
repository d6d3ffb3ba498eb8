//! Declared component directories and the document root.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Binding;
use crate::config::DOCUMENT_ROOT_NAME;
use crate::error::{resolve_against, MapperError, Result};
use crate::explore::{explore, ExploreOptions};
use crate::namespace::{MappingSource, NamespaceEntry};

/// Declarative `name -> directory` table supplied by the application.
///
/// Stored on disk as a JSON object. Relative directories are resolved
/// against the working directory when the table is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentTable {
    entries: BTreeMap<String, String>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(name.into(), path.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_str()))
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Reads a table file. A missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(data) => Self::from_json_str(&data).map_err(|error| {
                MapperError::Config(format!(
                    "failed to parse component table {}: {error}",
                    path.display()
                ))
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(MapperError::Config(format!(
                "failed to read component table {}: {error}",
                path.display()
            ))),
        }
    }

    /// Like [`ComponentTable::load`], but logs failures and falls back to an
    /// empty table so startup can continue.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|error| {
            log::warn!("{error}");
            Self::default()
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ComponentTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, path)| (name.into(), path.into()))
                .collect(),
        }
    }
}

/// Binds every declared component and guarantees a document root binding.
///
/// An explicit `document_root` replaces a table entry of the same name.
/// When no document root ends up present, `working_dir` itself is bound.
pub fn bind_components(
    table: &ComponentTable,
    document_root: Option<&Path>,
    working_dir: &Path,
    options: &ExploreOptions,
) -> Vec<Binding> {
    let mut bindings = Vec::with_capacity(table.len() + 1);

    if let Some(root) = document_root {
        let location = resolve_against(working_dir, root);
        bindings.push(bind(DOCUMENT_ROOT_NAME, location, options));
    }

    for (name, spec) in table.iter() {
        if name == DOCUMENT_ROOT_NAME && document_root.is_some() {
            continue;
        }
        let spec = spec.trim();
        if spec.is_empty() {
            log::warn!("component '{name}' has an empty path, skipping it");
            continue;
        }
        let location = resolve_against(working_dir, Path::new(spec));
        bindings.push(bind(name, location, options));
    }

    let has_document_root = bindings
        .iter()
        .any(|binding| binding.is_present() && binding.name() == DOCUMENT_ROOT_NAME);
    if !has_document_root {
        let tree = explore(working_dir, None, options).unwrap_or_default();
        bindings.push(Binding::Present(NamespaceEntry::new(
            DOCUMENT_ROOT_NAME,
            working_dir,
            MappingSource::DocumentRoot,
            tree,
        )));
    }

    bindings
}

fn bind(name: &str, location: PathBuf, options: &ExploreOptions) -> Binding {
    let source = if name == DOCUMENT_ROOT_NAME {
        MappingSource::DocumentRoot
    } else {
        MappingSource::Component
    };
    match explore(&location, None, options) {
        Some(tree) => Binding::Present(NamespaceEntry::new(name, location, source, tree)),
        None => Binding::Absent {
            name: name.to_string(),
            location,
        },
    }
}
