//! Conventional layout of a novel project.
//!
//! The store itself does not care what goes where. The writing agents do:
//! each one reads and writes fixed locations under `<project>/`. This module
//! names those locations and can lay down an empty project through the
//! store's own actions, so scaffolding is sandboxed like any other call.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::action::Request;
use crate::error::{Result, StoreError};
use crate::store::ProjectStore;

/// Project manifest file, relative to the project directory.
pub const MANIFEST_FILE: &str = "立项.json";

/// Chapter index file, relative to the project directory.
pub const CHAPTER_INDEX_FILE: &str = "plot/章节目录.txt";

/// Directories every project has, parents before children.
pub const PROJECT_DIRS: [&str; 8] = [
    "settings",
    "characters",
    "plot",
    "plot/章节大纲",
    "story",
    "项目进度",
    "项目进度/章节总结",
    "项目进度/校验报告",
];

/// The project brief stored in [`MANIFEST_FILE`].
///
/// Values are kept as strings, which is how the planning agent writes them
/// (`"预计字数": "600000"`). Keys this struct does not know about survive a
/// load/save cycle in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Genre
    #[serde(rename = "小说类型", default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Target readers
    #[serde(rename = "目标读者", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Core concept
    #[serde(rename = "核心概念", default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    /// Selling points
    #[serde(rename = "卖点", default, skip_serializing_if = "Option::is_none")]
    pub selling_points: Option<String>,
    /// Planned length in characters
    #[serde(rename = "预计字数", default, skip_serializing_if = "Option::is_none")]
    pub planned_words: Option<String>,
    /// Planned number of chapters
    #[serde(rename = "预计章数", default, skip_serializing_if = "Option::is_none")]
    pub planned_chapters: Option<String>,
    /// Writing suggestions
    #[serde(rename = "创作建议", default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
    /// Style requirements
    #[serde(rename = "文风要求", default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Anything else the author asked for
    #[serde(rename = "特殊需求", default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectManifest {
    /// A manifest with every known key present and empty, except the style
    /// which defaults to `默认`.
    pub fn template() -> Self {
        let empty = || Some(String::new());
        Self {
            genre: empty(),
            audience: empty(),
            concept: empty(),
            selling_points: empty(),
            planned_words: empty(),
            planned_chapters: empty(),
            suggestions: empty(),
            style: Some("默认".to_string()),
            special_requests: empty(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| StoreError::InvalidArgument(format!("invalid project manifest: {e}")))
    }

    /// Serialize as pretty-printed JSON, keeping non-ASCII text readable.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::InvalidArgument(format!("invalid project manifest: {e}")))
    }

    /// Load `<project>/立项.json` through the store.
    pub fn load(store: &ProjectStore, project: &str) -> Result<Self> {
        let path = format!("{project}/{MANIFEST_FILE}");
        match store.execute(&Request::new("read").path(path))? {
            crate::store::Outcome::Content(text) => Self::from_json(&text),
            other => Err(StoreError::InvalidArgument(format!(
                "unexpected result reading manifest: {other:?}"
            ))),
        }
    }
}

/// What [`scaffold`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldReport {
    /// Entries that were created
    pub created: Vec<String>,
    /// Entries that already existed and were left alone
    pub skipped: Vec<String>,
}

/// Create the standard directories and files for `project`.
///
/// Running it twice is harmless: anything already present is reported in
/// [`ScaffoldReport::skipped`] and never overwritten.
pub fn scaffold(store: &ProjectStore, project: &str) -> Result<ScaffoldReport> {
    let project = project.trim_matches('/');
    if project.is_empty() {
        return Err(StoreError::InvalidArgument(
            "project name must not be empty".to_string(),
        ));
    }

    let mut report = ScaffoldReport::default();
    let mut record = |path: String, result: Result<_>| match result {
        Ok(_) => {
            report.created.push(path);
            Ok(())
        }
        Err(StoreError::AlreadyExists(_)) => {
            report.skipped.push(path);
            Ok(())
        }
        Err(e) => Err(e),
    };

    let path = project.to_string();
    record(path.clone(), store.execute(&Request::new("create_dir").path(path)))?;

    for dir in PROJECT_DIRS {
        let path = format!("{project}/{dir}");
        record(path.clone(), store.execute(&Request::new("create_dir").path(path)))?;
    }

    let manifest = ProjectManifest::template().to_json()?;
    let files = [(MANIFEST_FILE, manifest), (CHAPTER_INDEX_FILE, String::new())];
    for (file, content) in files {
        let path = format!("{project}/{file}");
        let request = Request::new("create_file").path(path.clone()).content(content);
        record(path, store.execute(&request))?;
    }

    info!(
        project,
        created = report.created.len(),
        skipped = report.skipped.len(),
        "scaffolded project"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::StoreConfig;

    fn store() -> (tempfile::TempDir, ProjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(StoreConfig::new(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn test_scaffold_creates_layout() {
        let (_dir, store) = store();
        let report = scaffold(&store, "仙途").unwrap();
        assert!(report.skipped.is_empty());
        // project dir + standard dirs + two files
        assert_eq!(report.created.len(), 1 + PROJECT_DIRS.len() + 2);

        let root = store.root().join("仙途");
        for dir in PROJECT_DIRS {
            assert!(root.join(dir).is_dir(), "{dir} missing");
        }
        assert_eq!(fs::read_to_string(root.join(CHAPTER_INDEX_FILE)).unwrap(), "");

        let manifest = ProjectManifest::load(&store, "仙途").unwrap();
        assert_eq!(manifest, ProjectManifest::template());
    }

    #[test]
    fn test_scaffold_is_idempotent() {
        let (_dir, store) = store();
        scaffold(&store, "book").unwrap();
        fs::write(store.root().join("book").join(MANIFEST_FILE), r#"{"小说类型": "仙侠"}"#)
            .unwrap();

        let report = scaffold(&store, "book").unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.skipped.len(), 1 + PROJECT_DIRS.len() + 2);

        let manifest = ProjectManifest::load(&store, "book").unwrap();
        assert_eq!(manifest.genre.as_deref(), Some("仙侠"));
    }

    #[test]
    fn test_scaffold_fills_in_missing_parts() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root().join("book").join("story")).unwrap();
        let report = scaffold(&store, "book").unwrap();
        assert_eq!(report.skipped, ["book", "book/story"]);
    }

    #[test]
    fn test_scaffold_rejects_escape_and_empty_name() {
        let (_dir, store) = store();
        assert!(matches!(
            scaffold(&store, "../outside"),
            Err(StoreError::PathEscape(_))
        ));
        assert!(matches!(
            scaffold(&store, "/"),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_manifest_keys_and_extras() {
        let json = r#"{
            "小说类型": "仙侠",
            "预计字数": "600000",
            "预计章数": "150",
            "文风要求": "默认",
            "书名": "问道长生"
        }"#;
        let manifest = ProjectManifest::from_json(json).unwrap();
        assert_eq!(manifest.genre.as_deref(), Some("仙侠"));
        assert_eq!(manifest.planned_chapters.as_deref(), Some("150"));
        assert_eq!(manifest.audience, None);
        assert_eq!(manifest.extra["书名"], "问道长生");

        let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value["预计字数"], "600000");
        assert_eq!(value["书名"], "问道长生");
        assert!(value.get("目标读者").is_none());
    }

    #[test]
    fn test_manifest_invalid_json() {
        assert!(matches!(
            ProjectManifest::from_json("not json"),
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
