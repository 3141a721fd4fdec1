//! Errors produced by the project store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while handling a store action.
///
/// Every variant names the path (as the caller wrote it, relative to the
/// project root) so the message is useful on its own when it is handed back
/// to an agent.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required parameter is missing, or the request is otherwise malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The path must exist but does not
    #[error("not found: {0}")]
    NotFound(String),
    /// The path must be absent but exists
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The operation expected a file
    #[error("not a file: {0}")]
    NotAFile(String),
    /// The operation expected a directory
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// Non-recursive delete of a directory that still has children
    #[error("directory not empty: {0} (pass recursive=true to delete it with its contents)")]
    NotEmpty(String),
    /// The path resolves outside the project root
    #[error("path escapes the project root: {0}")]
    PathEscape(String),
    /// The action name is not one of the supported operations
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
    /// Line number outside `1..=total`
    #[error("invalid line number {line} for {path} ({total} lines)")]
    InvalidLine {
        /// Path of the file
        path: String,
        /// Requested 1-based line number
        line: u64,
        /// Number of lines in the file
        total: usize,
    },
    /// Content exceeds the configured size limit
    #[error("content for {path} is {size} bytes, limit is {limit} bytes")]
    ContentTooLarge {
        /// Path of the target file
        path: String,
        /// Size of the rejected content in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
    /// The file exists but is not valid UTF-8 text
    #[error("{0} is not valid UTF-8 text")]
    InvalidEncoding(String),
    /// The blocking task running the action panicked or was cancelled
    #[error("store task failed: {0}")]
    TaskFailed(String),
    /// Any other I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the failing call was made on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short, stable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::NotAFile(_) | Self::NotADirectory(_) => "wrong_kind",
            Self::NotEmpty(_) => "not_empty",
            Self::PathEscape(_) => "path_escape",
            Self::UnsupportedAction(_) => "unsupported_action",
            Self::InvalidLine { .. } => "invalid_line",
            Self::ContentTooLarge { .. } => "content_too_large",
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::TaskFailed(_) => "task_failed",
            Self::Io { .. } => "io",
        }
    }
}

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = StoreError::NotFound("characters/hero.md".to_string());
        assert_eq!(err.to_string(), "not found: characters/hero.md");

        let err = StoreError::NotEmpty("plot".to_string());
        assert!(err.to_string().contains("plot"));
        assert!(err.to_string().contains("recursive=true"));
    }

    #[test]
    fn test_wrong_kind_shares_category() {
        assert_eq!(StoreError::NotAFile("a".into()).kind(), "wrong_kind");
        assert_eq!(StoreError::NotADirectory("a".into()).kind(), "wrong_kind");
    }

    #[test]
    fn test_invalid_line_message() {
        let err = StoreError::InvalidLine {
            path: "story/ch1.txt".to_string(),
            line: 9,
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid line number 9 for story/ch1.txt (3 lines)"
        );
    }
}
