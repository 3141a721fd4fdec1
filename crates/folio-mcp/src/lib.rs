//! Folio MCP Server
//!
//! An MCP server that exposes a Folio project store as a single
//! `manage_novel_files` tool. Every writing agent in a pipeline talks to the
//! same store, so they all see (and are confined to) the same project root.

use std::sync::Arc;

use folio::{ActionKind, ProjectStore, Request};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::*,
    schemars::{self, JsonSchema},
    service::{RequestContext, RoleServer},
};
use serde::{Deserialize, Serialize};

/// Name of the file management tool.
pub const TOOL_NAME: &str = "manage_novel_files";

/// Parameters for the file management tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManageParams {
    /// Operation to perform: create_file, create_dir, list, read, update,
    /// rename, delete, tree, read_line or edit_line.
    pub action: String,

    /// Target path relative to the project root, e.g. `characters/hero.md`.
    /// Optional for `list` and `tree` (defaults to the root).
    #[serde(default)]
    pub path: Option<String>,

    /// File content for create_file and update, or the replacement line for
    /// edit_line.
    #[serde(default)]
    pub content: Option<String>,

    /// Destination path for rename.
    #[serde(default)]
    pub new_path: Option<String>,

    /// Allow delete to remove a non-empty directory (default: false).
    #[serde(default)]
    pub recursive: Option<bool>,

    /// 1-based line number for read_line and edit_line.
    #[serde(default)]
    pub line: Option<u64>,
}

impl From<ManageParams> for Request {
    fn from(params: ManageParams) -> Self {
        Request {
            action: params.action,
            path: params.path,
            content: params.content,
            new_path: params.new_path,
            recursive: params.recursive,
            line: params.line,
        }
    }
}

/// MCP Server that provides project file management via Folio
#[derive(Clone)]
pub struct FolioServer {
    store: Arc<ProjectStore>,
}

impl std::fmt::Debug for FolioServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolioServer")
            .field("root", &self.store.root())
            .finish_non_exhaustive()
    }
}

impl FolioServer {
    /// Create a server around an opened store.
    pub fn new(store: ProjectStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The store behind this server.
    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Run one tool call against the store.
    ///
    /// Store failures are reported as tool errors carrying the store's
    /// message, so the agent sees them and can correct itself.
    pub async fn manage(&self, params: ManageParams) -> CallToolResult {
        let request = Request::from(params);
        let result = Arc::clone(&self.store).execute_async(request).await;
        let text = self.store.render(&result);
        match result {
            Ok(_) => CallToolResult::success(vec![Content::text(text)]),
            Err(err) => {
                tracing::debug!(kind = err.kind(), error = %err, "tool call failed");
                CallToolResult::error(vec![Content::text(text)])
            }
        }
    }

    fn manage_tool(&self) -> Tool {
        let schema = schemars::schema_for!(ManageParams);
        let schema_json = serde_json::to_value(schema).unwrap_or_default();
        let input_schema = match schema_json {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        let actions = ActionKind::ALL.map(|kind| kind.as_str()).join(", ");
        Tool {
            name: TOOL_NAME.into(),
            title: Some("Manage Novel Project Files".into()),
            description: Some(
                format!(
                    "Create, list, read, update, rename and delete files and directories \
                    inside the novel project. All paths are relative to the project root; \
                    absolute paths and paths that leave the root are rejected. \
                    Supported actions: {actions}."
                )
                .into(),
            ),
            input_schema,
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for FolioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Folio manages the files of a novel project. Use the 'manage_novel_files' tool \
                with an action and a path relative to the project root, for example \
                action='create_file', path='characters/hero.md', content='...'. Directory \
                listings tag each entry as a file or a directory."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: vec![self.manage_tool()],
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        match request.name.as_ref() {
            TOOL_NAME => {
                let params: ManageParams = match &request.arguments {
                    Some(args) => serde_json::from_value(serde_json::Value::Object(args.clone()))
                        .map_err(|e| {
                        McpError::invalid_params(format!("Invalid parameters: {}", e), None)
                    })?,
                    None => {
                        return Err(McpError::invalid_params(
                            "Missing 'action' parameter",
                            None,
                        ));
                    }
                };
                tracing::debug!(action = %params.action, "manage_novel_files called");
                Ok(self.manage(params).await)
            }
            _ => Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use folio::StoreConfig;

    use super::*;

    fn server() -> (tempfile::TempDir, FolioServer) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProjectStore::open(StoreConfig::new(dir.path())).expect("open store");
        (dir, FolioServer::new(store))
    }

    /// Text of the first content item and the error flag, as sent on the wire.
    fn reply(result: &CallToolResult) -> (String, bool) {
        let value = serde_json::to_value(result).expect("serialize result");
        let text = value["content"][0]["text"].as_str().expect("text content");
        (text.to_string(), value["isError"] == true)
    }

    #[test]
    fn test_manage_params_minimal() {
        let json = r#"{"action": "list"}"#;
        let params: ManageParams = serde_json::from_str(json).expect("parse failed");
        assert_eq!(params.action, "list");
        assert!(params.path.is_none());
        assert!(params.recursive.is_none());
    }

    #[test]
    fn test_manage_params_into_request() {
        let json = r#"{"action": "rename", "path": "a.txt", "new_path": "b.txt"}"#;
        let params: ManageParams = serde_json::from_str(json).expect("parse failed");
        let request = Request::from(params);
        assert_eq!(request, Request::new("rename").path("a.txt").new_path("b.txt"));
    }

    #[test]
    fn test_tool_schema_lists_parameters() {
        let (_dir, server) = server();
        let tool = server.manage_tool();
        assert_eq!(tool.name, TOOL_NAME);
        let properties = tool.input_schema["properties"]
            .as_object()
            .expect("schema properties");
        for name in ["action", "path", "content", "new_path", "recursive", "line"] {
            assert!(properties.contains_key(name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_manage_success_and_error() {
        let (_dir, server) = server();

        let params = ManageParams {
            action: "create_file".into(),
            path: Some("characters/hero.md".into()),
            content: Some("Hero bio".into()),
            new_path: None,
            recursive: None,
            line: None,
        };
        let result = server.manage(params.clone()).await;
        assert_eq!(
            reply(&result),
            ("created file: characters/hero.md".to_string(), false)
        );

        let result = server.manage(params).await;
        assert_eq!(
            reply(&result),
            ("error: already exists: characters/hero.md".to_string(), true)
        );
    }

    #[tokio::test]
    async fn test_content_that_looks_like_an_error_is_a_success() {
        let (dir, server) = server();
        std::fs::write(dir.path().join("log.txt"), "error: the hero fell").expect("write");

        let params = ManageParams {
            action: "read".into(),
            path: Some("log.txt".into()),
            content: None,
            new_path: None,
            recursive: None,
            line: None,
        };
        let result = server.manage(params).await;
        assert_eq!(reply(&result), ("error: the hero fell".to_string(), false));
    }
}
