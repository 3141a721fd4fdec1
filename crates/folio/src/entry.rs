//! Directory entries as the store sees them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file (anything that is not a directory)
    #[serde(rename = "file")]
    File,
    /// Directory
    #[serde(rename = "folder")]
    Directory,
}

impl EntryKind {
    /// Classify a path, following symlinks. Returns `None` if nothing is
    /// there.
    pub fn of(path: &Path) -> Option<EntryKind> {
        let meta = fs::metadata(path)
            .or_else(|_| fs::symlink_metadata(path))
            .ok()?;
        Some(if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }
}

/// A direct child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Whether the entry itself is a symlink
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub symlink: bool,
}

/// Read the children of `dir`, sorted by name.
pub(crate) fn read_dir_sorted(dir: &Path) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        let symlink = entry
            .file_type()
            .map(|t| t.is_symlink())
            .unwrap_or(false);
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind: EntryKind::of(&path).unwrap_or(EntryKind::File),
            symlink,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
