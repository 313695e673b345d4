use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Error type for file system operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when path is invalid or escapes its root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Error when the file does not exist
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// FileSystem defines the port (interface) plugins and servers use to read
/// and write project files. Paths are absolute.
#[async_trait]
pub trait FileSystem: Send + Sync + 'static {
    /// Whether a regular file exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> FileSystemResult<Bytes>;

    async fn read_to_string(&self, path: &Path) -> FileSystemResult<String>;

    async fn write(&self, path: &Path, contents: &str) -> FileSystemResult<()>;
}

/// Join a URL path onto `root`, percent-decoding it first.
///
/// Rejects any `..` component so the result always stays below `root`.
pub fn confine(root: &Path, url_path: &str) -> FileSystemResult<PathBuf> {
    let decoded = urlencoding::decode(url_path)
        .map_err(|e| FileSystemError::InvalidPath(format!("{url_path}: {e}")))?;

    let mut joined = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FileSystemError::InvalidPath(url_path.to_string()));
            }
        }
    }
    Ok(joined)
}
