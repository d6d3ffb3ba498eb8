//! Virtual path resolution.
//!
//! A virtual path either names a top-level mapping in its first segment, or
//! lives under the document root. In the second case the first segment must
//! exist at the top level of the document root's explored tree. Deeper
//! segments are not checked here; the filesystem is consulted when the
//! resolved path is actually touched.

use std::path::{Path, PathBuf};

use crate::error::{MapperError, Result};
use crate::explore::DirNode;
use crate::namespace::{Namespace, NamespaceEntry};

/// Where a virtual path points.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    entry: &'a NamespaceEntry,
    segments: Vec<String>,
    mapped: bool,
}

impl<'a> Resolution<'a> {
    pub fn physical_root(&self) -> &'a Path {
        &self.entry.physical_root
    }

    /// True when the path fell back to the document root.
    pub fn is_document_root(&self) -> bool {
        !self.mapped
    }

    /// True for `/` itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for paths with exactly one segment, e.g. `/thoregon.core`.
    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    /// Segments below the entry's location.
    pub fn relative_segments(&self) -> &[String] {
        if self.mapped {
            &self.segments[1..]
        } else {
            &self.segments
        }
    }

    pub fn physical_path(&self) -> PathBuf {
        let mut path = self.entry.location();
        path.extend(self.relative_segments());
        path
    }

    /// Explored directory the path addresses, if it is one and its children
    /// were read during exploration.
    pub fn dir(&self) -> Option<&'a DirNode> {
        self.entry.tree.dir_at(self.relative_segments())
    }
}

/// Splits a virtual path into its non-empty segments.
///
/// `.` and `..` are rejected so a resolved path never leaves its root.
fn split_segments(virtual_path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    for segment in virtual_path.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(MapperError::NotFound(virtual_path.to_string())),
            other => segments.push(other.to_string()),
        }
    }
    Ok(segments)
}

impl Namespace {
    /// Resolves a virtual path to its namespace entry.
    ///
    /// `/` resolves to the document root itself. The empty string, and any
    /// path whose first segment is neither a mapping name nor a top-level
    /// name of the document root, fails with [`MapperError::NotFound`].
    pub fn resolve(&self, virtual_path: &str) -> Result<Resolution<'_>> {
        if virtual_path.is_empty() {
            return Err(MapperError::NotFound(virtual_path.to_string()));
        }
        let segments = split_segments(virtual_path)?;

        let (entry, mapped) = match segments.first() {
            None => (self.document_root(), false),
            Some(first) => match self.get(first) {
                Some(entry) => (entry, true),
                None if self.document_root().tree.contains(first) => {
                    (self.document_root(), false)
                }
                None => return Err(MapperError::NotFound(virtual_path.to_string())),
            },
        };

        Ok(Resolution {
            entry,
            segments,
            mapped,
        })
    }
}
