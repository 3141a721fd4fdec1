//! Folio MCP Server
//!
//! This binary runs the Folio project store as an MCP server over stdio.
//! It exposes a `manage_novel_files` tool confined to the `--root` directory.

use std::path::PathBuf;

use clap::Parser;
use folio::{DEFAULT_MAX_CONTENT_BYTES, DEFAULT_ROOT, EntryLabels, ProjectStore, StoreConfig};
use folio_mcp::FolioServer;
use rmcp::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "folio-mcp")]
#[command(about = "MCP server for sandboxed novel project files")]
struct Args {
    /// Project root; every path is resolved relative to it
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Maximum size in bytes of content accepted by a single write
    #[arg(long, default_value_t = DEFAULT_MAX_CONTENT_BYTES)]
    max_content_bytes: u64,

    /// Tag placed before file names in listings
    #[arg(long)]
    file_label: Option<String>,

    /// Tag placed before directory names in listings
    #[arg(long)]
    dir_label: Option<String>,
}

impl Args {
    fn store_config(&self) -> StoreConfig {
        let mut labels = EntryLabels::default();
        if let Some(file) = &self.file_label {
            labels.file = file.clone();
        }
        if let Some(dir) = &self.dir_label {
            labels.dir = dir.clone();
        }
        StoreConfig::new(&self.root)
            .max_content_bytes(self.max_content_bytes)
            .labels(labels)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing - output to stderr so it doesn't interfere with MCP stdio
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    tracing::info!(root = %args.root.display(), "Starting Folio MCP server");

    let store = ProjectStore::open(args.store_config())?;
    let server = FolioServer::new(store);

    // Serve over stdio
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("Failed to start MCP service: {}", e);
        })?;

    tracing::info!("Folio MCP server running");

    service.waiting().await?;

    tracing::info!("Folio MCP server shutting down");

    Ok(())
}
