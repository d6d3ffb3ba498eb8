//! Sources of top-level namespace entries.
//!
//! Two sources contribute entries: module discovery scans family directories
//! for versioned modules, the component table binds explicitly declared
//! directories. Each declared name yields a [`Binding`]; names whose
//! directory is missing stay visible as [`Binding::Absent`] until the merge
//! drops them.

mod components;
mod modules;

use std::collections::BTreeMap;
use std::path::PathBuf;

pub use components::{bind_components, ComponentTable};
pub use modules::{discover_modules, family_base, resolve_module_root};

use crate::namespace::NamespaceEntry;

/// Top-level entries by name.
pub type Mappings = BTreeMap<String, NamespaceEntry>;

/// Outcome of binding one name to a physical directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Present(NamespaceEntry),
    /// The directory did not exist or could not be listed.
    Absent { name: String, location: PathBuf },
}

impl Binding {
    pub fn name(&self) -> &str {
        match self {
            Self::Present(entry) => &entry.name,
            Self::Absent { name, .. } => name,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Merges module bindings and component bindings into one mapping.
///
/// Bindings are applied in order, modules first; a later binding replaces an
/// earlier one with the same name, so components always win over modules.
/// Absent bindings never remove an existing entry.
pub fn merge_mappings(modules: Vec<Binding>, components: Vec<Binding>) -> Mappings {
    let mut merged = Mappings::new();
    for binding in modules.into_iter().chain(components) {
        match binding {
            Binding::Present(entry) => {
                if let Some(replaced) = merged.insert(entry.name.clone(), entry) {
                    log::debug!(
                        "mapping '{}' from {} overridden",
                        replaced.name,
                        replaced.physical_root.display()
                    );
                }
            }
            Binding::Absent { name, location } => {
                log::warn!(
                    "mapping '{name}' skipped: {} is not a readable directory",
                    location.display()
                );
            }
        }
    }
    merged
}
