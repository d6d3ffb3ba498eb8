//! The merged virtual namespace.
//!
//! A [`Namespace`] is built once from module discovery and the component
//! table and is immutable afterwards. Top-level names map to
//! [`NamespaceEntry`] values; the distinguished `www` entry is held apart as
//! the document root and catches every path whose first segment is not a
//! mapping name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{MapperConfig, DOCUMENT_ROOT_NAME};
use crate::explore::DirNode;
use crate::mapping::{
    bind_components, discover_modules, merge_mappings, resolve_module_root, Mappings,
};

/// Which source produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    /// Discovered below a module family directory.
    Module,
    /// Declared in the component table.
    Component,
    /// The document root.
    DocumentRoot,
}

/// A top-level name bound to a physical directory and its explored tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceEntry {
    pub name: String,
    /// For modules the family directory, otherwise the bound directory itself.
    pub physical_root: PathBuf,
    pub source: MappingSource,
    /// Contents of [`NamespaceEntry::location`] at exploration time.
    pub tree: DirNode,
}

impl NamespaceEntry {
    pub fn new(
        name: impl Into<String>,
        physical_root: impl Into<PathBuf>,
        source: MappingSource,
        tree: DirNode,
    ) -> Self {
        Self {
            name: name.into(),
            physical_root: physical_root.into(),
            source,
            tree,
        }
    }

    /// Physical directory the entry's name stands for.
    pub fn location(&self) -> PathBuf {
        match self.source {
            MappingSource::Module => self.physical_root.join(&self.name),
            MappingSource::Component | MappingSource::DocumentRoot => self.physical_root.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    mapping: BTreeMap<String, NamespaceEntry>,
    document_root: NamespaceEntry,
}

impl Namespace {
    /// Explores every configured source and merges the results.
    ///
    /// This walks the filesystem; callers build once and share the result.
    pub fn build(config: &MapperConfig) -> Self {
        let started = Instant::now();
        let module_root = resolve_module_root(&config.working_dir, config.module_root.as_deref());
        let modules = discover_modules(&module_root, &config.module_families, &config.explore);
        let components = bind_components(
            &config.components,
            config.document_root.as_deref(),
            &config.working_dir,
            &config.explore,
        );
        let namespace = Self::from_mappings(merge_mappings(modules, components), &config.working_dir);
        log::info!(
            "namespace built module_root={} mappings={} document_root={} elapsed_ms={}",
            module_root.display(),
            namespace.mapping.len(),
            namespace.document_root.physical_root.display(),
            started.elapsed().as_millis()
        );
        namespace
    }

    /// Splits the document root out of merged mappings.
    ///
    /// Without a `www` entry the document root is `working_dir` with an empty
    /// tree.
    pub fn from_mappings(mut mapping: Mappings, working_dir: &Path) -> Self {
        let document_root = mapping.remove(DOCUMENT_ROOT_NAME).unwrap_or_else(|| {
            NamespaceEntry::new(
                DOCUMENT_ROOT_NAME,
                working_dir,
                MappingSource::DocumentRoot,
                DirNode::new(),
            )
        });
        Self {
            mapping,
            document_root,
        }
    }

    pub fn mapping(&self) -> &BTreeMap<String, NamespaceEntry> {
        &self.mapping
    }

    pub fn get(&self, name: &str) -> Option<&NamespaceEntry> {
        self.mapping.get(name)
    }

    pub fn document_root(&self) -> &NamespaceEntry {
        &self.document_root
    }

    /// Top-level mapping names, excluding the document root.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mapping.keys().map(String::as_str)
    }
}
