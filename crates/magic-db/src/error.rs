use thiserror::Error;

use crate::http::HttpError;

#[derive(Error, Debug)]
pub enum MagicDbError {
    // Network errors
    #[error("Download failed: {0}")]
    Http(#[from] HttpError),

    #[error("Timed out in {secs}s")]
    Timeout { secs: f64 },

    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    // Archive errors
    #[error("Failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Cannot find valid magic files in downloaded archive")]
    MissingBaseDir,

    #[error("Path traversal detected in archive: {path}")]
    UnsafePath { path: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, MagicDbError>;
