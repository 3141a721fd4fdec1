//! Path resolution and containment for a single project root.
//!
//! Every path handed to the store goes through [`Sandbox::resolve`] before
//! anything else happens. Resolution is done in two passes:
//!
//! 1. **Lexical**: absolute paths are refused outright, `.` segments are
//!    dropped and `..` segments pop the previous segment. Popping past the
//!    root is an escape.
//! 2. **Physical**: the deepest ancestor of the joined path that exists on
//!    disk is canonicalized (following symlinks) and must still live under
//!    the canonical root.
//!
//! The physical pass runs on every call, so a symlink planted between two
//! calls is caught by the next one.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{Result, StoreError};

/// A path that passed the containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPath {
    /// Normalized `/`-separated path relative to the root; empty for the root
    rel: String,
    /// Absolute location on disk
    abs: PathBuf,
}

impl EntryPath {
    /// Normalized path relative to the project root (empty for the root).
    pub fn relative(&self) -> &str {
        &self.rel
    }

    /// Absolute path on disk.
    pub fn absolute(&self) -> &Path {
        &self.abs
    }

    /// Whether this is the project root itself.
    pub fn is_root(&self) -> bool {
        self.rel.is_empty()
    }

    /// Path of a direct child of this entry.
    pub fn child(&self, name: &str) -> EntryPath {
        let rel = if self.rel.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.rel, name)
        };
        EntryPath {
            rel,
            abs: self.abs.join(name),
        }
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rel.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.rel)
        }
    }
}

/// The directory boundary for one project.
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Canonical root directory
    root: PathBuf,
}

impl Sandbox {
    /// Open a sandbox at `root`, creating the directory if it is missing.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| StoreError::io(root, e))?;
        Ok(Self { root })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recreate the root if it was removed out from under us.
    pub fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        }
        Ok(())
    }

    /// The root as an [`EntryPath`].
    pub fn root_entry(&self) -> EntryPath {
        EntryPath {
            rel: String::new(),
            abs: self.root.clone(),
        }
    }

    /// Resolve a caller-supplied path.
    ///
    /// The empty string and `.` resolve to the root.
    pub fn resolve(&self, raw: &str) -> Result<EntryPath> {
        let mut parts: Vec<String> = Vec::new();
        for component in Path::new(raw).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => return Err(escape(raw)),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(escape(raw));
                    }
                }
                Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
            }
        }

        let mut abs = self.root.clone();
        abs.extend(&parts);
        self.verify_physical(&abs, raw)?;

        Ok(EntryPath {
            rel: parts.join("/"),
            abs,
        })
    }

    /// Resolve an optional path, treating `None` as the root.
    pub fn resolve_optional(&self, raw: Option<&str>) -> Result<EntryPath> {
        match raw {
            Some(raw) => self.resolve(raw),
            None => Ok(self.root_entry()),
        }
    }

    /// Check that the deepest existing ancestor of `abs` stays under the root
    /// once symlinks are followed.
    fn verify_physical(&self, abs: &Path, raw: &str) -> Result<()> {
        for candidate in abs.ancestors() {
            match fs::symlink_metadata(candidate) {
                Ok(_) => {
                    return match candidate.canonicalize() {
                        Ok(real) if real.starts_with(&self.root) => Ok(()),
                        Ok(_) => Err(escape(raw)),
                        // A dangling symlink: its target cannot be checked.
                        Err(e) if e.kind() == ErrorKind::NotFound => Err(escape(raw)),
                        Err(e) => Err(StoreError::io(candidate, e)),
                    };
                }
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                    continue;
                }
                Err(e) => return Err(StoreError::io(candidate, e)),
            }
        }
        Err(escape(raw))
    }
}

fn escape(raw: &str) -> StoreError {
    warn!(path = raw, "rejected path outside project root");
    StoreError::PathEscape(raw.to_string())
}
