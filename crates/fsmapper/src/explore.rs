//! Directory exploration into an in-memory name tree.
//!
//! The explorer mirrors a physical directory as a [`DirNode`]: a map from
//! child name to either a file marker or a nested directory. File contents
//! are never read.
//!
//! - Children named in [`IGNORED_NAMES`] are skipped.
//! - Symbolic links are followed; anything that is not a regular file or a
//!   directory after following links is left out.
//! - Children are explored in parallel, the resulting map is ordered by name.
//! - Directories that cannot be listed are left out.
//! - Exploration is bounded: directories at [`ExploreOptions::max_depth`]
//!   are kept as truncated nodes without children, and a directory whose
//!   canonical path is one of its own ancestors (a link cycle) is left out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::canonicalize_existing_path;

/// Names that never appear in an explored tree.
pub const IGNORED_NAMES: [&str; 3] = [".git", "node_modules", ".DS_Store"];

/// Default number of directory levels explored below a root.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Returns true if a directory entry with this name is never explored.
pub fn is_ignored(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
}

/// A child of a [`DirNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File,
    Dir(DirNode),
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir(_))
    }

    pub fn as_dir(&self) -> Option<&DirNode> {
        match self {
            Self::Dir(node) => Some(node),
            Self::File => None,
        }
    }
}

/// Directory structure captured at exploration time.
///
/// Child names never contain a path separator. The tree is not kept in sync
/// with the filesystem; it goes stale when the physical directory changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirNode {
    children: BTreeMap<String, TreeEntry>,
    truncated: bool,
}

impl DirNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory the depth bound stopped at. Its children were never read.
    pub fn truncated() -> Self {
        Self {
            children: BTreeMap::new(),
            truncated: true,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: TreeEntry) {
        self.children.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.children.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeEntry)> {
        self.children.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Consumes the node, yielding its children.
    pub fn into_children(self) -> impl Iterator<Item = (String, TreeEntry)> {
        self.children.into_iter()
    }

    /// Looks up the entry addressed by `segments` below this node.
    ///
    /// Returns `None` for an empty segment list, when a segment is missing, or
    /// when an intermediate segment is a file.
    pub fn entry_at<S: AsRef<str>>(&self, segments: &[S]) -> Option<&TreeEntry> {
        let (last, parents) = segments.split_last()?;
        let parent = self.dir_at(parents)?;
        parent.get(last.as_ref())
    }

    /// Looks up the explored directory addressed by `segments`; an empty list
    /// yields `self`. Truncated directories are not returned, their children
    /// are unknown.
    pub fn dir_at<S: AsRef<str>>(&self, segments: &[S]) -> Option<&DirNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| {
                node.get(segment.as_ref()).and_then(TreeEntry::as_dir)
            })
            .filter(|node| !node.truncated)
    }
}

/// Bounds applied while exploring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExploreOptions {
    /// Directories nested this deep below the explored root are kept as
    /// truncated nodes.
    pub max_depth: usize,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Explores `dir` into a [`DirNode`].
///
/// Returns `None` if `dir` does not exist, is not a directory, or cannot be
/// listed. When `prefix` is given, only top-level children whose name starts
/// with it are kept; nested levels are not filtered.
pub fn explore(dir: &Path, prefix: Option<&str>, options: &ExploreOptions) -> Option<DirNode> {
    let metadata = fs::metadata(dir).ok()?;
    if !metadata.is_dir() {
        return None;
    }
    let lineage = vec![canonicalize_existing_path(dir.to_path_buf())];
    explore_dir(dir, prefix, 0, &lineage, options)
}

fn explore_dir(
    dir: &Path,
    prefix: Option<&str>,
    depth: usize,
    lineage: &[PathBuf],
    options: &ExploreOptions,
) -> Option<DirNode> {
    let read_dir = match fs::read_dir(dir) {
        Ok(iter) => iter,
        Err(error) => {
            log::debug!("cannot list {}: {error}", dir.display());
            return None;
        }
    };
    let entries: Vec<_> = read_dir.filter_map(Result::ok).collect();

    let children: Vec<(String, TreeEntry)> = entries
        .into_par_iter()
        .filter_map(|entry| {
            // Names that are not valid UTF-8 cannot be addressed by a virtual path.
            let name = entry.file_name().into_string().ok()?;
            if is_ignored(&name) {
                return None;
            }
            if let Some(prefix) = prefix {
                if !name.starts_with(prefix) {
                    return None;
                }
            }

            let child_path = entry.path();
            let metadata = fs::metadata(&child_path).ok()?;
            if metadata.is_file() {
                return Some((name, TreeEntry::File));
            }
            if !metadata.is_dir() {
                return None;
            }

            if depth + 1 >= options.max_depth {
                return Some((name, TreeEntry::Dir(DirNode::truncated())));
            }

            let canonical = canonicalize_existing_path(child_path.clone());
            if lineage.contains(&canonical) {
                log::debug!("skipping directory cycle at {}", child_path.display());
                return None;
            }
            let mut child_lineage = lineage.to_vec();
            child_lineage.push(canonical);

            // A subdirectory that cannot be listed is not a readable child.
            let node = explore_dir(&child_path, None, depth + 1, &child_lineage, options)?;
            Some((name, TreeEntry::Dir(node)))
        })
        .collect();

    Some(DirNode {
        children: children.into_iter().collect(),
        truncated: false,
    })
}
