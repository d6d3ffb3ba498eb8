//! Building stat records from filesystem metadata.

use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::explore::is_ignored;
use crate::types::StatInfo;

/// Last segment of a virtual path; empty for `/`.
pub(crate) fn virtual_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

/// Appends `name` to a virtual directory path.
pub(crate) fn join_virtual(path: &str, name: &str) -> String {
    format!("{}/{name}", path.trim_end_matches('/'))
}

/// Replaces the last segment of a virtual path.
pub(crate) fn replace_virtual_name(path: &str, name: &str) -> String {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{name}"),
        None => name.to_string(),
    }
}

/// True for paths with exactly one non-empty segment.
pub(crate) fn is_top_level(path: &str) -> bool {
    path.split('/').filter(|segment| !segment.is_empty()).count() == 1
}

impl StatInfo {
    pub fn from_metadata(path: &str, metadata: &Metadata) -> Self {
        let mtime = timestamp(metadata.modified());
        Self {
            path: path.to_string(),
            name: virtual_name(path).to_string(),
            birthtime: metadata.created().map(DateTime::from).unwrap_or(mtime),
            ctime: change_time(metadata).unwrap_or(mtime),
            mtime,
            atime: metadata.accessed().map(DateTime::from).unwrap_or(mtime),
            size: metadata.len(),
        }
    }
}

fn timestamp(time: io::Result<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::from).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;

    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    DateTime::from_timestamp(metadata.ctime(), nanos)
}

#[cfg(not(unix))]
fn change_time(_metadata: &Metadata) -> Option<DateTime<Utc>> {
    None
}

/// Child names of a physical directory, for directories that were not
/// explored. Ignored names are left out.
pub(crate) async fn read_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Ok(name) = entry.file_name().into_string() {
            if !is_ignored(&name) {
                names.push(name);
            }
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// True when `path` is a regular file.
pub(crate) async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
