//! Module discovery under `<root>/<prefix>modules`.

use std::fs;
use std::path::{Path, PathBuf};

use super::Binding;
use crate::config::MODULE_ROOT_MARKER;
use crate::error::resolve_against;
use crate::explore::{explore, ExploreOptions, TreeEntry};
use crate::namespace::{MappingSource, NamespaceEntry};

/// Picks the directory holding the module families.
///
/// Order: `explicit`, then the path named in the marker file in
/// `working_dir`, then `working_dir` itself. Relative results are resolved
/// against `working_dir`.
pub fn resolve_module_root(working_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    let root = explicit
        .map(Path::to_path_buf)
        .or_else(|| read_marker(working_dir))
        .unwrap_or_else(|| working_dir.to_path_buf());
    resolve_against(working_dir, &root)
}

fn read_marker(working_dir: &Path) -> Option<PathBuf> {
    let marker = working_dir.join(MODULE_ROOT_MARKER);
    let content = fs::read_to_string(&marker).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        log::warn!("{} is empty, ignoring it", marker.display());
        return None;
    }
    Some(PathBuf::from(trimmed))
}

/// Directory name of a module family, e.g. `thoregon.modules`.
pub fn family_base(prefix: &str) -> String {
    format!("{prefix}modules")
}

/// Discovers one entry per module directory of every family.
///
/// Each entry's physical root is the family directory; the module itself
/// lives at `<family root>/<name>`. A missing family contributes nothing.
pub fn discover_modules(
    module_root: &Path,
    families: &[String],
    options: &ExploreOptions,
) -> Vec<Binding> {
    let mut bindings = Vec::new();
    for prefix in families {
        let family_root = module_root.join(family_base(prefix));
        let Some(tree) = explore(&family_root, Some(prefix), options) else {
            log::debug!("module family '{prefix}' not found at {}", family_root.display());
            continue;
        };
        for (name, entry) in tree.into_children() {
            match entry {
                TreeEntry::Dir(node) => bindings.push(Binding::Present(NamespaceEntry::new(
                    name,
                    family_root.clone(),
                    MappingSource::Module,
                    node,
                ))),
                TreeEntry::File => {
                    log::debug!("ignoring file '{name}' in {}", family_root.display());
                }
            }
        }
    }
    bindings
}
