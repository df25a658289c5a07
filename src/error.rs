use std::path::PathBuf;

use thiserror::Error;

/// Per-document failures. Page- and lap-level problems never reach this type;
/// they are skipped in place and show up in counts and logs instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document {path:?} is unreadable: {reason}")]
    DocumentUnreadable { path: PathBuf, reason: String },

    #[error("unsupported document format {extension:?} for {path:?} (expected .pdf or .txt)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write lap table {path:?}: {message}")]
    Output { path: PathBuf, message: String },
}

pub type ExtractResult<T> = Result<T, ExtractError>;
