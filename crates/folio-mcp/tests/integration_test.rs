//! Integration tests for the Folio MCP server.
//!
//! These tests spawn the actual MCP server binary against a scratch project
//! root and communicate with it over stdio using JSON-RPC.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;

/// Helper to spawn the MCP server process
struct McpServerProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl McpServerProcess {
    fn spawn(root: &TempDir) -> Self {
        Self::spawn_with_args(root, &[])
    }

    fn spawn_with_args(root: &TempDir, args: &[&str]) -> Self {
        let binary = env!("CARGO_BIN_EXE_folio-mcp");
        let root_arg = root.path().to_string_lossy().into_owned();

        let mut child = Command::new(binary)
            .arg("--root")
            .arg(&root_arg)
            .args(args)
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap_or_else(|e| panic!("Failed to spawn MCP server at {:?}: {}", binary, e));

        let stdout = BufReader::new(child.stdout.take().expect("stdout not captured"));
        Self {
            child,
            stdout,
            next_id: 1,
        }
    }

    /// Send a JSON-RPC request and get the response
    fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;

        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));

        let mut response_line = String::new();
        self.stdout
            .read_line(&mut response_line)
            .expect("read response");

        let response: Value = serde_json::from_str(&response_line)
            .unwrap_or_else(|e| panic!("parse response '{}': {}", response_line.trim(), e));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], id);
        response
    }

    /// Send a notification (no response expected)
    fn notify(&mut self, method: &str) {
        self.send(json!({
            "jsonrpc": "2.0",
            "method": method
        }));
    }

    fn send(&mut self, message: Value) {
        let stdin = self.child.stdin.as_mut().expect("stdin not captured");
        let line = serde_json::to_string(&message).expect("serialize message");
        writeln!(stdin, "{}", line).expect("write message");
        stdin.flush().expect("flush stdin");
    }

    /// Call the file tool and return its text and error flag.
    fn manage(&mut self, arguments: Value) -> (String, bool) {
        let response = self.request(
            "tools/call",
            json!({ "name": "manage_novel_files", "arguments": arguments }),
        );
        let result = response
            .get("result")
            .unwrap_or_else(|| panic!("Expected result, got: {}", response));
        let text = result["content"][0]["text"]
            .as_str()
            .expect("text content")
            .to_string();
        (text, result["isError"] == true)
    }
}

impl Drop for McpServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Perform MCP initialization handshake
fn initialize(server: &mut McpServerProcess) -> Value {
    let init_response = server.request(
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "folio-mcp-test",
                "version": "0.1.0"
            }
        }),
    );
    assert!(
        init_response.get("result").is_some(),
        "Expected result in initialize response, got: {}",
        init_response
    );

    server.notify("notifications/initialized");

    // Give the server a moment to process
    std::thread::sleep(Duration::from_millis(50));

    init_response
}

fn connect() -> (TempDir, McpServerProcess) {
    let root = TempDir::new().expect("create temp dir");
    let mut server = McpServerProcess::spawn(&root);
    initialize(&mut server);
    (root, server)
}

#[test]
fn test_mcp_initialize() {
    let root = TempDir::new().expect("create temp dir");
    let mut server = McpServerProcess::spawn(&root);
    let response = initialize(&mut server);

    let result = &response["result"];
    assert!(
        result.get("serverInfo").is_some(),
        "Expected serverInfo in result"
    );
    assert!(
        result["capabilities"].get("tools").is_some(),
        "Expected tools capability"
    );
}

#[test]
fn test_mcp_list_tools() {
    let (_root, mut server) = connect();
    let response = server.request("tools/list", json!({}));

    let tools = response["result"]["tools"]
        .as_array()
        .expect("tools should be an array");
    assert_eq!(tools.len(), 1, "Expected exactly one tool: {:?}", tools);

    let tool = &tools[0];
    assert_eq!(tool["name"], "manage_novel_files");
    assert!(
        tool.get("description").is_some(),
        "Tool should have description"
    );
    let properties = &tool["inputSchema"]["properties"];
    for name in ["action", "path", "content", "new_path", "recursive"] {
        assert!(
            properties.get(name).is_some(),
            "inputSchema should describe '{}'",
            name
        );
    }
}

#[test]
fn test_mcp_character_scenario() {
    let (root, mut server) = connect();

    assert_eq!(
        server.manage(json!({ "action": "create_dir", "path": "characters" })),
        ("created directory: characters".to_string(), false)
    );
    assert_eq!(
        server.manage(json!({
            "action": "create_file",
            "path": "characters/hero.md",
            "content": "Hero bio"
        })),
        ("created file: characters/hero.md".to_string(), false)
    );
    assert_eq!(
        server.manage(json!({ "action": "list", "path": "characters" })),
        ("[文件] hero.md".to_string(), false)
    );
    assert_eq!(
        server.manage(json!({ "action": "read", "path": "characters/hero.md" })),
        ("Hero bio".to_string(), false)
    );
    assert_eq!(
        server.manage(json!({
            "action": "rename",
            "path": "characters/hero.md",
            "new_path": "characters/protagonist.md"
        })),
        (
            "renamed characters/hero.md to characters/protagonist.md".to_string(),
            false
        )
    );

    let (text, is_error) =
        server.manage(json!({ "action": "read", "path": "characters/hero.md" }));
    assert!(is_error);
    assert!(text.contains("characters/hero.md"), "got: {}", text);

    // The store writes through to the real directory.
    let on_disk = fs::read_to_string(root.path().join("characters").join("protagonist.md"))
        .expect("read renamed file");
    assert_eq!(on_disk, "Hero bio");
}

#[test]
fn test_mcp_path_escape() {
    let (root, mut server) = connect();
    let outside = root
        .path()
        .parent()
        .expect("temp dir has a parent")
        .join("folio-escape-target.txt");

    let (text, is_error) = server.manage(json!({
        "action": "create_file",
        "path": "../folio-escape-target.txt",
        "content": "x"
    }));
    assert!(is_error);
    assert!(text.contains("escapes the project root"), "got: {}", text);
    assert!(!outside.exists());

    let (_, is_error) = server.manage(json!({ "action": "read", "path": "/etc/passwd" }));
    assert!(is_error);
}

#[test]
fn test_mcp_delete_guard() {
    let (_root, mut server) = connect();
    server.manage(json!({ "action": "create_file", "path": "plot/大纲.txt", "content": "x" }));

    let (text, is_error) = server.manage(json!({ "action": "delete", "path": "plot" }));
    assert!(is_error);
    assert!(text.contains("recursive"), "got: {}", text);

    assert_eq!(
        server.manage(json!({ "action": "delete", "path": "plot", "recursive": true })),
        ("deleted directory recursively: plot".to_string(), false)
    );
}

#[test]
fn test_mcp_unsupported_action() {
    let (_root, mut server) = connect();
    assert_eq!(
        server.manage(json!({ "action": "chmod", "path": "a.txt" })),
        ("error: unsupported action: chmod".to_string(), true)
    );
}

#[test]
fn test_mcp_custom_labels() {
    let root = TempDir::new().expect("create temp dir");
    fs::create_dir(root.path().join("story")).expect("create dir");
    fs::write(root.path().join("notes.md"), "n").expect("write file");

    let mut server =
        McpServerProcess::spawn_with_args(&root, &["--file-label", "F", "--dir-label", "D"]);
    initialize(&mut server);

    assert_eq!(
        server.manage(json!({ "action": "list" })),
        ("F notes.md\nD story".to_string(), false)
    );
}

#[test]
fn test_mcp_unknown_tool() {
    let (_root, mut server) = connect();

    let response = server.request(
        "tools/call",
        json!({ "name": "nonexistent_tool", "arguments": {} }),
    );

    assert!(
        response.get("error").is_some(),
        "Expected error for unknown tool, got: {}",
        response
    );
}

#[test]
fn test_mcp_invalid_arguments() {
    let (_root, mut server) = connect();

    // `action` is required by the schema.
    let response = server.request(
        "tools/call",
        json!({ "name": "manage_novel_files", "arguments": { "path": "a.txt" } }),
    );
    assert!(
        response.get("error").is_some(),
        "Expected error for missing action, got: {}",
        response
    );
}
