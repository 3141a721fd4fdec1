//! Folio: a sandboxed project file store
//!
//! Folio gives a group of writing agents one shared, bounded workspace. Every
//! call names an action (`create_file`, `list`, `read`, `update`, `rename`,
//! `delete`, ...) and a path relative to the project root. Paths are checked
//! lexically and physically before anything touches the disk, so no request
//! can read or write outside the root.
//!
//! ```no_run
//! use folio::{ProjectStore, Request, StoreConfig};
//!
//! let store = ProjectStore::open(StoreConfig::new("novel_data"))?;
//! let reply = store.manage(&Request::new("create_dir").path("characters"));
//! assert_eq!(reply, "created directory: characters");
//! # Ok::<(), folio::StoreError>(())
//! ```

mod action;
mod config;
mod entry;
mod error;
pub mod layout;
pub mod lines;
mod sandbox;
mod store;
mod tree;

pub use action::{Action, ActionKind, Request};
pub use config::{DEFAULT_MAX_CONTENT_BYTES, DEFAULT_ROOT, EntryLabels, StoreConfig};
pub use entry::{DirEntry, EntryKind};
pub use error::{Result, StoreError};
pub use layout::{ProjectManifest, ScaffoldReport, scaffold};
pub use sandbox::{EntryPath, Sandbox};
pub use store::{Deletion, Outcome, ProjectStore};
pub use tree::{TreeNode, build_tree, render_tree};
