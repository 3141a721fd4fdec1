//! The closed set of store operations.
//!
//! Callers send a loosely typed [`Request`] (an action name plus optional
//! parameters). [`Action::parse`] turns it into a typed [`Action`] whose
//! variants carry exactly the fields they need, with every path already run
//! through the sandbox. Nothing touches the filesystem until parsing has
//! succeeded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::sandbox::{EntryPath, Sandbox};

/// A store invocation as it arrives from a tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Operation name, e.g. `create_file`
    pub action: String,
    /// Target path relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// File content for `create_file`, `update` and `edit_line`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Destination for `rename`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    /// Allow `delete` to remove a non-empty directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    /// 1-based line number for `read_line` and `edit_line`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl Request {
    /// Start a request for the named action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Set the target path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the rename destination.
    pub fn new_path(mut self, new_path: impl Into<String>) -> Self {
        self.new_path = Some(new_path.into());
        self
    }

    /// Set the recursive flag.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    /// Set the line number.
    pub fn line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }
}

/// Names of the supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Create a new file
    CreateFile,
    /// Create a new directory
    CreateDir,
    /// List a directory
    List,
    /// Read a whole file
    Read,
    /// Overwrite an existing file
    Update,
    /// Move or rename an entry
    Rename,
    /// Remove a file or directory
    Delete,
    /// Recursive listing
    Tree,
    /// Read one line of a file
    ReadLine,
    /// Replace one line of a file
    EditLine,
}

impl ActionKind {
    /// Every supported action, in documentation order.
    pub const ALL: [ActionKind; 10] = [
        ActionKind::CreateFile,
        ActionKind::CreateDir,
        ActionKind::List,
        ActionKind::Read,
        ActionKind::Update,
        ActionKind::Rename,
        ActionKind::Delete,
        ActionKind::Tree,
        ActionKind::ReadLine,
        ActionKind::EditLine,
    ];

    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateFile => "create_file",
            ActionKind::CreateDir => "create_dir",
            ActionKind::List => "list",
            ActionKind::Read => "read",
            ActionKind::Update => "update",
            ActionKind::Rename => "rename",
            ActionKind::Delete => "delete",
            ActionKind::Tree => "tree",
            ActionKind::ReadLine => "read_line",
            ActionKind::EditLine => "edit_line",
        }
    }

    /// Returns true if the action changes the project tree.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ActionKind::CreateFile
                | ActionKind::CreateDir
                | ActionKind::Update
                | ActionKind::Rename
                | ActionKind::Delete
                | ActionKind::EditLine
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::UnsupportedAction(s.to_string()))
    }
}

/// A validated operation, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create a file (and any missing parents)
    CreateFile {
        /// Target file
        path: EntryPath,
        /// Initial content
        content: String,
    },
    /// Create a directory (and any missing parents)
    CreateDir {
        /// Target directory
        path: EntryPath,
    },
    /// List the direct children of a directory
    List {
        /// Directory to list
        path: EntryPath,
    },
    /// Read a file
    Read {
        /// File to read
        path: EntryPath,
    },
    /// Overwrite an existing file
    Update {
        /// File to overwrite
        path: EntryPath,
        /// New content
        content: String,
    },
    /// Move an entry
    Rename {
        /// Existing entry
        from: EntryPath,
        /// Destination, must not exist
        to: EntryPath,
    },
    /// Remove an entry
    Delete {
        /// Entry to remove
        path: EntryPath,
        /// Whether non-empty directories may be removed
        recursive: bool,
    },
    /// Recursive listing of a directory
    Tree {
        /// Directory to walk
        path: EntryPath,
    },
    /// Read a single line
    ReadLine {
        /// File to read
        path: EntryPath,
        /// 1-based line number
        line: u64,
    },
    /// Replace a single line
    EditLine {
        /// File to edit
        path: EntryPath,
        /// 1-based line number
        line: u64,
        /// Replacement text for the line
        content: String,
    },
}

impl Action {
    /// Validate a request against the sandbox.
    ///
    /// Paths are checked for containment first, then the action name, then
    /// the parameters the action requires.
    pub fn parse(request: &Request, sandbox: &Sandbox) -> Result<Self> {
        let path = request
            .path
            .as_deref()
            .map(|raw| sandbox.resolve(raw))
            .transpose()?;
        let new_path = request
            .new_path
            .as_deref()
            .map(|raw| sandbox.resolve(raw))
            .transpose()?;

        let kind: ActionKind = request.action.parse()?;

        let required_path = || path.clone().ok_or_else(|| missing(kind, "path"));
        let required_content = || {
            request
                .content
                .clone()
                .ok_or_else(|| missing(kind, "content"))
        };
        let required_line = || request.line.ok_or_else(|| missing(kind, "line"));
        let optional_path = || path.clone().unwrap_or_else(|| sandbox.root_entry());

        let action = match kind {
            ActionKind::CreateFile => Action::CreateFile {
                path: required_path()?,
                content: required_content()?,
            },
            ActionKind::CreateDir => Action::CreateDir {
                path: required_path()?,
            },
            ActionKind::List => Action::List {
                path: optional_path(),
            },
            ActionKind::Read => Action::Read {
                path: required_path()?,
            },
            ActionKind::Update => Action::Update {
                path: required_path()?,
                content: required_content()?,
            },
            ActionKind::Rename => Action::Rename {
                from: required_path()?,
                to: new_path
                    .clone()
                    .ok_or_else(|| missing(kind, "new_path"))?,
            },
            ActionKind::Delete => Action::Delete {
                path: required_path()?,
                recursive: request.recursive.unwrap_or(false),
            },
            ActionKind::Tree => Action::Tree {
                path: optional_path(),
            },
            ActionKind::ReadLine => Action::ReadLine {
                path: required_path()?,
                line: required_line()?,
            },
            ActionKind::EditLine => Action::EditLine {
                path: required_path()?,
                line: required_line()?,
                content: required_content()?,
            },
        };
        Ok(action)
    }

    /// The kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateFile { .. } => ActionKind::CreateFile,
            Action::CreateDir { .. } => ActionKind::CreateDir,
            Action::List { .. } => ActionKind::List,
            Action::Read { .. } => ActionKind::Read,
            Action::Update { .. } => ActionKind::Update,
            Action::Rename { .. } => ActionKind::Rename,
            Action::Delete { .. } => ActionKind::Delete,
            Action::Tree { .. } => ActionKind::Tree,
            Action::ReadLine { .. } => ActionKind::ReadLine,
            Action::EditLine { .. } => ActionKind::EditLine,
        }
    }
}

fn missing(kind: ActionKind, param: &str) -> StoreError {
    StoreError::InvalidArgument(format!("{kind} requires the '{param}' parameter"))
}
