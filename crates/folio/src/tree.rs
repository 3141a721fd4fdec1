//! Recursive project tree.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::entry::{EntryKind, read_dir_sorted};
use crate::error::Result;
use crate::sandbox::EntryPath;

/// A node in the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Entry name
    pub name: String,
    /// File or folder
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Path relative to the project root
    pub path: String,
    /// Children, directories first; empty for files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Walk the directory at `dir` and return its children as a tree.
///
/// Directories come before files and each group is sorted by name.
/// Symlinked directories are listed but not descended into.
pub fn build_tree(dir: &EntryPath) -> Result<Vec<TreeNode>> {
    let mut nodes = Vec::new();
    for entry in read_dir_sorted(dir.absolute())? {
        let child = dir.child(&entry.name);
        let children = if entry.kind == EntryKind::Directory && !entry.symlink {
            build_tree(&child)?
        } else {
            Vec::new()
        };
        nodes.push(TreeNode {
            name: entry.name,
            kind: entry.kind,
            path: child.relative().to_string(),
            children,
        });
    }
    // Stable sort keeps the name order within each group.
    nodes.sort_by_key(|node| node.kind != EntryKind::Directory);
    Ok(nodes)
}

/// Render a tree as indented text, one entry per line, under a `root/`
/// header. Directories carry a trailing `/`.
pub fn render_tree(root: &str, nodes: &[TreeNode]) -> String {
    let mut out = format!("{root}/");
    render_nodes(&mut out, nodes, 1);
    out
}

fn render_nodes(out: &mut String, nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let suffix = if node.kind == EntryKind::Directory {
            "/"
        } else {
            ""
        };
        let _ = write!(out, "\n{indent}{}{suffix}", node.name);
        render_nodes(out, &node.children, depth + 1);
    }
}
