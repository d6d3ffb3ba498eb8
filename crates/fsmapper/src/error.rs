use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("not found: '{0}'")]
    NotFound(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

/// Resolves `spec` against `base` and removes `.` and `..` components lexically.
///
/// Absolute specs are only normalized. Nothing is looked up on disk, so the
/// result is usable for directories that do not exist (yet).
pub fn resolve_against(base: &Path, spec: &Path) -> PathBuf {
    let joined = if spec.is_absolute() {
        spec.to_path_buf()
    } else {
        base.join(spec)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
