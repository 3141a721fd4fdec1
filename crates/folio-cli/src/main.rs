//! Folio CLI
//!
//! Runs single store actions from the shell, with the same sandboxing and
//! messages the MCP tool gives to agents.
//!
//! Usage:
//!   folio --root novel_data mkdir characters
//!   folio create-file characters/hero.md "Hero bio"
//!   folio ls characters
//!   folio rm plot --recursive
//!   folio init 仙途

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use folio::{
    DEFAULT_MAX_CONTENT_BYTES, DEFAULT_ROOT, EntryLabels, ProjectStore, Request, StoreConfig,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Manage files in a sandboxed novel project")]
struct Args {
    /// Project root; every path is resolved relative to it
    #[arg(long, global = true, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Maximum size in bytes of content accepted by a single write
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CONTENT_BYTES)]
    max_content_bytes: u64,

    /// Use `[file]` / `[dir]` tags in listings
    #[arg(long, global = true)]
    ascii_labels: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new file (reads stdin when CONTENT is omitted)
    CreateFile { path: String, content: Option<String> },
    /// Create a directory and any missing parents
    Mkdir { path: String },
    /// List a directory
    Ls { path: Option<String> },
    /// Print a file
    Cat { path: String },
    /// Replace the content of an existing file (reads stdin when CONTENT is omitted)
    Update { path: String, content: Option<String> },
    /// Move or rename an entry
    Mv { path: String, new_path: String },
    /// Delete a file or directory
    Rm {
        path: String,
        /// Delete a non-empty directory with everything in it
        #[arg(short, long)]
        recursive: bool,
    },
    /// Show the directory tree
    Tree { path: Option<String> },
    /// Print one line of a file
    Line { path: String, line: u64 },
    /// Replace one line of a file
    EditLine {
        path: String,
        line: u64,
        content: String,
    },
    /// Lay down the standard directories and files for a new project
    Init { project: String },
}

impl Cmd {
    /// The store request for this command, or `None` for commands that are
    /// not a single store action.
    fn into_request(self) -> anyhow::Result<Option<Request>> {
        let request = match self {
            Cmd::CreateFile { path, content } => Request::new("create_file")
                .path(path)
                .content(content_or_stdin(content)?),
            Cmd::Mkdir { path } => Request::new("create_dir").path(path),
            Cmd::Ls { path } => with_path(Request::new("list"), path),
            Cmd::Cat { path } => Request::new("read").path(path),
            Cmd::Update { path, content } => Request::new("update")
                .path(path)
                .content(content_or_stdin(content)?),
            Cmd::Mv { path, new_path } => Request::new("rename").path(path).new_path(new_path),
            Cmd::Rm { path, recursive } => Request::new("delete").path(path).recursive(recursive),
            Cmd::Tree { path } => with_path(Request::new("tree"), path),
            Cmd::Line { path, line } => Request::new("read_line").path(path).line(line),
            Cmd::EditLine {
                path,
                line,
                content,
            } => Request::new("edit_line")
                .path(path)
                .line(line)
                .content(content),
            Cmd::Init { .. } => return Ok(None),
        };
        Ok(Some(request))
    }
}

fn with_path(request: Request, path: Option<String>) -> Request {
    match path {
        Some(path) => request.path(path),
        None => request,
    }
}

fn content_or_stdin(content: Option<String>) -> anyhow::Result<String> {
    match content {
        Some(content) => Ok(content),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn run(args: Args) -> anyhow::Result<bool> {
    let labels = if args.ascii_labels {
        EntryLabels::ascii()
    } else {
        EntryLabels::default()
    };
    let config = StoreConfig::new(&args.root)
        .max_content_bytes(args.max_content_bytes)
        .labels(labels);
    let store = ProjectStore::open(config)?;

    if let Cmd::Init { project } = &args.command {
        let report = folio::scaffold(&store, project)?;
        for path in &report.created {
            println!("created: {path}");
        }
        for path in &report.skipped {
            println!("exists:  {path}");
        }
        return Ok(true);
    }

    let Some(request) = args.command.into_request()? else {
        return Ok(true);
    };
    match store.execute(&request) {
        Ok(outcome) => {
            println!("{}", outcome.to_text(&store.config().labels));
            Ok(true)
        }
        Err(err) => {
            eprintln!("folio: {err}");
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("folio: {e:#}");
            ExitCode::FAILURE
        }
    }
}
