//! Configuration for building and querying a namespace.

use std::path::PathBuf;

use crate::explore::ExploreOptions;
use crate::mapping::ComponentTable;

/// Mapping name of the document root.
pub const DOCUMENT_ROOT_NAME: &str = "www";

/// Document served for a request of the bare root `/`.
pub const DEFAULT_DOCUMENT: &str = "thoregon.html";

/// Environment variable that overrides the module root.
pub const MODULE_ROOT_ENV: &str = "THOREGON_ROOT";

/// Marker file in the working directory naming the module root.
pub const MODULE_ROOT_MARKER: &str = ".thoregonroot";

/// Module family prefixes, in discovery order.
pub const DEFAULT_MODULE_FAMILIES: [&str; 3] = ["evolux.", "thoregon.", "terra."];

/// Component table file looked up in the working directory.
pub const DEFAULT_COMPONENTS_FILE: &str = "components.json";

/// Entry point a directory is normally loaded through.
pub const DEFAULT_ENTRY_POINT: &str = "index.mjs";

/// Entry point variant preferred over [`DEFAULT_ENTRY_POINT`] when present.
pub const ALTERNATE_ENTRY_POINT: &str = "index.reliant.mjs";

#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Base for relative paths and the fallback document root.
    pub working_dir: PathBuf,
    /// Explicit module root, taking precedence over the marker file.
    pub module_root: Option<PathBuf>,
    /// Module family prefixes; each is discovered under `<prefix>modules`.
    pub module_families: Vec<String>,
    /// Declared components, `name -> directory`.
    pub components: ComponentTable,
    /// Document root override; replaces a `www` component.
    pub document_root: Option<PathBuf>,
    /// Virtual path (without leading `/`) substituted for a request of `/`.
    pub default_document: String,
    pub explore: ExploreOptions,
}

impl MapperConfig {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            module_root: None,
            module_families: DEFAULT_MODULE_FAMILIES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            components: ComponentTable::default(),
            document_root: None,
            default_document: DEFAULT_DOCUMENT.to_string(),
            explore: ExploreOptions::default(),
        }
    }

    pub fn with_module_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.module_root = Some(root.into());
        self
    }

    pub fn with_components(mut self, components: ComponentTable) -> Self {
        self.components = components;
        self
    }

    pub fn with_document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.document_root = Some(root.into());
        self
    }

    pub fn with_default_document(mut self, document: impl Into<String>) -> Self {
        self.default_document = document.into().trim_start_matches('/').to_string();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.explore.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_three_module_families() {
        let config = MapperConfig::new("/srv/dev");
        assert_eq!(config.module_families, vec!["evolux.", "thoregon.", "terra."]);
        assert_eq!(config.default_document, "thoregon.html");
        assert!(config.components.is_empty());
    }

    #[test]
    fn default_document_drops_leading_slash() {
        let config = MapperConfig::new("/srv/dev").with_default_document("/app.html");
        assert_eq!(config.default_document, "app.html");
    }
}
