//! The project file store.
//!
//! [`ProjectStore`] owns one [`Sandbox`] and runs [`Action`]s against it.
//! Two entry points are provided:
//!
//! - [`ProjectStore::execute`] returns a typed [`Outcome`] or [`StoreError`].
//! - [`ProjectStore::manage`] never fails: it renders either result as the
//!   plain text an agent gets back from the tool call.
//!
//! The store keeps no cache; every call goes to the filesystem, so edits made
//! outside the store are visible immediately. Mutating actions take a
//! per-store lock so that the existence checks and the write that follows
//! are not interleaved with another caller sharing the same store.

use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::action::{Action, Request};
use crate::config::{EntryLabels, StoreConfig};
use crate::entry::{DirEntry, EntryKind, read_dir_sorted};
use crate::error::{Result, StoreError};
use crate::lines;
use crate::sandbox::{EntryPath, Sandbox};
use crate::tree::{TreeNode, build_tree, render_tree};

/// How an entry was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// A file (or a symlink) was removed
    File,
    /// An empty directory was removed
    EmptyDirectory,
    /// A directory was removed with everything under it
    Recursive,
}

/// Successful result of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `create_file` succeeded
    FileCreated {
        /// Created file
        path: String,
    },
    /// `create_dir` succeeded
    DirCreated {
        /// Created directory
        path: String,
    },
    /// Children of a directory
    Listing {
        /// Listed directory
        path: String,
        /// Children sorted by name
        entries: Vec<DirEntry>,
    },
    /// Full content of a file
    Content(String),
    /// `update` succeeded
    FileUpdated {
        /// Updated file
        path: String,
    },
    /// `rename` succeeded
    Renamed {
        /// Old path
        from: String,
        /// New path
        to: String,
    },
    /// `delete` succeeded
    Deleted {
        /// Removed entry
        path: String,
        /// What was removed
        how: Deletion,
    },
    /// Recursive listing
    Tree {
        /// Directory that was walked
        path: String,
        /// Its children
        nodes: Vec<TreeNode>,
    },
    /// A single line
    Line {
        /// File the line came from
        path: String,
        /// 1-based line number
        number: u64,
        /// Line text
        text: String,
        /// Number of lines in the file
        total: usize,
    },
    /// `edit_line` succeeded
    LineEdited {
        /// Edited file
        path: String,
        /// 1-based line number
        number: u64,
        /// Previous text of the line
        previous: String,
        /// Number of lines in the file
        total: usize,
    },
}

impl Outcome {
    /// Render the outcome as the text returned to the caller.
    pub fn to_text(&self, labels: &EntryLabels) -> String {
        match self {
            Outcome::FileCreated { path } => format!("created file: {path}"),
            Outcome::DirCreated { path } => format!("created directory: {path}"),
            Outcome::Listing { path, entries } if entries.is_empty() => {
                format!("(empty directory: {path})")
            }
            Outcome::Listing { entries, .. } => entries
                .iter()
                .map(|entry| {
                    let label = match entry.kind {
                        EntryKind::File => &labels.file,
                        EntryKind::Directory => &labels.dir,
                    };
                    format!("{label} {}", entry.name)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Outcome::Content(content) => content.clone(),
            Outcome::FileUpdated { path } => format!("updated file: {path}"),
            Outcome::Renamed { from, to } => format!("renamed {from} to {to}"),
            Outcome::Deleted { path, how } => match how {
                Deletion::File => format!("deleted file: {path}"),
                Deletion::EmptyDirectory => format!("deleted empty directory: {path}"),
                Deletion::Recursive => format!("deleted directory recursively: {path}"),
            },
            Outcome::Tree { path, nodes } => render_tree(path, nodes),
            Outcome::Line {
                number,
                text,
                total,
                ..
            } => format!("line {number} of {total}: {text}"),
            Outcome::LineEdited {
                path,
                number,
                total,
                ..
            } => format!("edited line {number} of {path} ({total} lines)"),
        }
    }
}

/// A sandboxed file store for one project.
#[derive(Debug)]
pub struct ProjectStore {
    sandbox: Sandbox,
    config: StoreConfig,
    write_lock: Mutex<()>,
}

impl ProjectStore {
    /// Open the store, creating the project root if needed.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let sandbox = Sandbox::new(&config.root)?;
        info!(root = %sandbox.root().display(), "opened project store");
        Ok(Self {
            sandbox,
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    /// The sandbox used to resolve paths.
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run a request and render the result as text. Errors are rendered with
    /// an `error: ` prefix.
    pub fn manage(&self, request: &Request) -> String {
        let result = self.execute(request);
        if let Err(err) = &result {
            debug!(action = %request.action, kind = err.kind(), error = %err, "action failed");
        }
        self.render(&result)
    }

    /// [`manage`](Self::manage) on tokio's blocking pool.
    pub async fn manage_async(self: Arc<Self>, request: Request) -> String {
        let store = Arc::clone(&self);
        let result = self.execute_async(request).await;
        store.render(&result)
    }

    /// [`execute`](Self::execute) on tokio's blocking pool.
    pub async fn execute_async(self: Arc<Self>, request: Request) -> Result<Outcome> {
        tokio::task::spawn_blocking(move || self.execute(&request))
            .await
            .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }

    /// Render a result as the text returned to the caller.
    pub fn render(&self, result: &Result<Outcome>) -> String {
        match result {
            Ok(outcome) => outcome.to_text(&self.config.labels),
            Err(err) => format!("error: {err}"),
        }
    }

    /// Validate and run a request.
    pub fn execute(&self, request: &Request) -> Result<Outcome> {
        self.sandbox.ensure_root()?;
        let action = Action::parse(request, &self.sandbox)?;
        self.run(action)
    }

    /// Run an already validated action.
    pub fn run(&self, action: Action) -> Result<Outcome> {
        let kind = action.kind();
        debug!(action = %kind, "running store action");
        let _guard = kind.is_mutating().then(|| self.lock());

        match action {
            Action::CreateFile { path, content } => self.create_file(&path, &content),
            Action::CreateDir { path } => self.create_dir(&path),
            Action::List { path } => self.list(&path),
            Action::Read { path } => Ok(Outcome::Content(self.read_text(&path)?)),
            Action::Update { path, content } => self.update(&path, &content),
            Action::Rename { from, to } => self.rename(&from, &to),
            Action::Delete { path, recursive } => self.delete(&path, recursive),
            Action::Tree { path } => self.tree(&path),
            Action::ReadLine { path, line } => self.read_line(&path, line),
            Action::EditLine {
                path,
                line,
                content,
            } => self.edit_line(&path, line, &content),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The mutex guards no data, so a poisoned lock is still usable.
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_size(&self, path: &EntryPath, content: &str) -> Result<()> {
        let size = content.len() as u64;
        if size > self.config.max_content_bytes {
            return Err(StoreError::ContentTooLarge {
                path: path.to_string(),
                size,
                limit: self.config.max_content_bytes,
            });
        }
        Ok(())
    }

    fn create_file(&self, path: &EntryPath, content: &str) -> Result<Outcome> {
        self.check_size(path, content)?;
        if exists(path.absolute()) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        let parents = NewParents::create(self.root(), path)?;
        let dir = parent_dir(path)?;

        let staged = stage(dir, content.as_bytes(), new_file_permissions())
            .map_err(|e| StoreError::io(dir, e))?;
        staged
            .persist_noclobber(path.absolute())
            .map_err(|e| match e.error.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.to_string()),
                _ => StoreError::io(path.absolute(), e.error),
            })?;
        parents.keep();

        info!(path = %path, bytes = content.len(), "created file");
        Ok(Outcome::FileCreated {
            path: path.to_string(),
        })
    }

    fn create_dir(&self, path: &EntryPath) -> Result<Outcome> {
        if exists(path.absolute()) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        let parents = NewParents::create(self.root(), path)?;
        fs::create_dir(path.absolute()).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.to_string()),
            _ => StoreError::io(path.absolute(), e),
        })?;
        parents.keep();

        info!(path = %path, "created directory");
        Ok(Outcome::DirCreated {
            path: path.to_string(),
        })
    }

    fn list(&self, path: &EntryPath) -> Result<Outcome> {
        expect_kind(path, EntryKind::Directory)?;
        Ok(Outcome::Listing {
            path: path.to_string(),
            entries: read_dir_sorted(path.absolute())?,
        })
    }

    fn read_text(&self, path: &EntryPath) -> Result<String> {
        expect_kind(path, EntryKind::File)?;
        let bytes = fs::read(path.absolute()).map_err(|e| StoreError::io(path.absolute(), e))?;
        String::from_utf8(bytes).map_err(|_| StoreError::InvalidEncoding(path.to_string()))
    }

    fn update(&self, path: &EntryPath, content: &str) -> Result<Outcome> {
        self.check_size(path, content)?;
        expect_kind(path, EntryKind::File)?;
        self.replace_contents(path, content.as_bytes())?;

        info!(path = %path, bytes = content.len(), "updated file");
        Ok(Outcome::FileUpdated {
            path: path.to_string(),
        })
    }

    fn rename(&self, from: &EntryPath, to: &EntryPath) -> Result<Outcome> {
        if from.is_root() || to.is_root() {
            return Err(StoreError::InvalidArgument(
                "the project root cannot be renamed or replaced".to_string(),
            ));
        }
        if !exists(from.absolute()) {
            return Err(StoreError::NotFound(from.to_string()));
        }
        if exists(to.absolute()) {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        if to.relative().starts_with(&format!("{}/", from.relative())) {
            return Err(StoreError::InvalidArgument(format!(
                "cannot move {from} into itself ({to})"
            )));
        }
        let parents = NewParents::create(self.root(), to)?;
        fs::rename(from.absolute(), to.absolute())
            .map_err(|e| StoreError::io(from.absolute(), e))?;
        parents.keep();

        info!(from = %from, to = %to, "renamed entry");
        Ok(Outcome::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn delete(&self, path: &EntryPath, recursive: bool) -> Result<Outcome> {
        if path.is_root() {
            return Err(StoreError::InvalidArgument(
                "the project root cannot be deleted".to_string(),
            ));
        }
        let meta = match fs::symlink_metadata(path.absolute()) {
            Ok(meta) => meta,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Err(StoreError::NotFound(path.to_string()));
            }
            Err(e) => return Err(StoreError::io(path.absolute(), e)),
        };

        let how = if !meta.is_dir() {
            fs::remove_file(path.absolute()).map_err(|e| StoreError::io(path.absolute(), e))?;
            Deletion::File
        } else if recursive {
            fs::remove_dir_all(path.absolute())
                .map_err(|e| StoreError::io(path.absolute(), e))?;
            Deletion::Recursive
        } else {
            fs::remove_dir(path.absolute()).map_err(|e| match e.kind() {
                ErrorKind::DirectoryNotEmpty => StoreError::NotEmpty(path.to_string()),
                _ => StoreError::io(path.absolute(), e),
            })?;
            Deletion::EmptyDirectory
        };

        info!(path = %path, how = ?how, "deleted entry");
        Ok(Outcome::Deleted {
            path: path.to_string(),
            how,
        })
    }

    /// Replace the content of an existing file through an exclusively created
    /// temp file in the same directory and a rename. In-root symlinks are
    /// written through, so the link itself stays in place.
    fn replace_contents(&self, path: &EntryPath, data: &[u8]) -> Result<()> {
        let target = path
            .absolute()
            .canonicalize()
            .map_err(|e| StoreError::io(path.absolute(), e))?;
        if !target.starts_with(self.root()) {
            return Err(StoreError::PathEscape(path.to_string()));
        }
        let dir = target
            .parent()
            .ok_or_else(|| StoreError::NotAFile(path.to_string()))?;
        let permissions = fs::metadata(&target).map(|m| m.permissions()).ok();

        let staged = stage(dir, data, permissions).map_err(|e| StoreError::io(dir, e))?;
        staged
            .persist(&target)
            .map_err(|e| StoreError::io(&target, e.error))?;
        Ok(())
    }

    fn tree(&self, path: &EntryPath) -> Result<Outcome> {
        expect_kind(path, EntryKind::Directory)?;
        Ok(Outcome::Tree {
            path: path.to_string(),
            nodes: build_tree(path)?,
        })
    }

    fn read_line(&self, path: &EntryPath, line: u64) -> Result<Outcome> {
        let content = self.read_text(path)?;
        let found = lines::get_line(&content, line).ok_or_else(|| StoreError::InvalidLine {
            path: path.to_string(),
            line,
            total: lines::line_count(&content),
        })?;
        Ok(Outcome::Line {
            path: path.to_string(),
            number: found.number,
            text: found.text.to_string(),
            total: found.total,
        })
    }

    fn edit_line(&self, path: &EntryPath, line: u64, replacement: &str) -> Result<Outcome> {
        let content = self.read_text(path)?;
        let edit = lines::replace_line(&content, line, replacement).ok_or_else(|| {
            StoreError::InvalidLine {
                path: path.to_string(),
                line,
                total: lines::line_count(&content),
            }
        })?;
        self.check_size(path, &edit.content)?;
        self.replace_contents(path, edit.content.as_bytes())?;

        info!(path = %path, line, "edited line");
        Ok(Outcome::LineEdited {
            path: path.to_string(),
            number: line,
            previous: edit.previous,
            total: edit.total,
        })
    }
}

/// Whether anything (including a dangling symlink) is at `path`.
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn expect_kind(path: &EntryPath, expected: EntryKind) -> Result<()> {
    match (EntryKind::of(path.absolute()), expected) {
        (None, _) => Err(StoreError::NotFound(path.to_string())),
        (Some(EntryKind::Directory), EntryKind::File) => {
            Err(StoreError::NotAFile(path.to_string()))
        }
        (Some(EntryKind::File), EntryKind::Directory) => {
            Err(StoreError::NotADirectory(path.to_string()))
        }
        _ => Ok(()),
    }
}

/// Directories created for an entry's missing parents.
///
/// Dropping it without calling [`keep`](Self::keep) removes those
/// directories again, deepest first, so a failed action leaves no empty
/// parents behind.
#[must_use]
#[derive(Debug)]
struct NewParents {
    created: Vec<PathBuf>,
}

impl NewParents {
    /// Walk the parent chain of `path` below `root`, creating what is
    /// missing. A non-directory in the chain is reported by its own path.
    fn create(root: &Path, path: &EntryPath) -> Result<Self> {
        let mut parents = NewParents {
            created: Vec::new(),
        };
        let Some((parent_rel, _)) = path.relative().rsplit_once('/') else {
            return Ok(parents);
        };

        let mut current = root.to_path_buf();
        let mut rel = String::new();
        for part in parent_rel.split('/') {
            current.push(part);
            if !rel.is_empty() {
                rel.push('/');
            }
            rel.push_str(part);

            match fs::metadata(&current) {
                Ok(meta) if meta.is_dir() => continue,
                Ok(_) => return Err(StoreError::NotADirectory(rel)),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&current, e)),
            }
            match fs::create_dir(&current) {
                Ok(()) => parents.created.push(current.clone()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && current.is_dir() => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    return Err(StoreError::NotADirectory(rel));
                }
                Err(e) => return Err(StoreError::io(&current, e)),
            }
        }
        Ok(parents)
    }

    /// The action succeeded; leave the directories in place.
    fn keep(mut self) {
        self.created.clear();
    }
}

impl Drop for NewParents {
    fn drop(&mut self) {
        for dir in self.created.iter().rev() {
            let _ = fs::remove_dir(dir);
        }
    }
}

fn parent_dir(path: &EntryPath) -> Result<&Path> {
    path.absolute()
        .parent()
        .ok_or_else(|| StoreError::InvalidArgument(format!("{path} has no parent directory")))
}

/// Permissions for newly created files.
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// Write `data` to a fresh temp file in `dir`. The file is opened with a
/// random name and `O_EXCL`, and is deleted again if it is never persisted.
fn stage(
    dir: &Path,
    data: &[u8],
    permissions: Option<fs::Permissions>,
) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    if let Some(permissions) = permissions {
        file.as_file().set_permissions(permissions)?;
    }
    file.as_file().sync_all()?;
    Ok(file)
}
