use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::ports::file_system::{FileSystem, FileSystemError, FileSystemResult};

/// File system adapter on `tokio::fs`.
///
/// When built with [`FileSystemAdapter::rooted`] every access is checked
/// against the canonical root, so symlinks cannot lead outside the project.
#[derive(Debug, Default, Clone)]
pub struct FileSystemAdapter {
    root: Option<PathBuf>,
}

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Restrict every access to paths below `root`.
    pub fn rooted(root: impl AsRef<Path>) -> FileSystemResult<Self> {
        let root = std::fs::canonicalize(root.as_ref()).map_err(FileSystemError::IoError)?;
        Ok(Self { root: Some(root) })
    }

    /// Security check: ensure the resolved path is still within root
    async fn check(&self, path: &Path) -> FileSystemResult<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };

        let canonical = match tokio::fs::canonicalize(path).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Not there yet: the closest existing ancestor decides
                let mut ancestor = path.parent();
                loop {
                    match ancestor {
                        Some(dir) => match tokio::fs::canonicalize(dir).await {
                            Ok(canonical) => break canonical,
                            Err(_) => ancestor = dir.parent(),
                        },
                        None => {
                            return Err(FileSystemError::InvalidPath(path.display().to_string()));
                        }
                    }
                }
            }
            Err(e) => return Err(FileSystemError::IoError(e)),
        };

        if !canonical.starts_with(root) {
            return Err(FileSystemError::InvalidPath(format!(
                "Path traversal attempt detected: {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn io_error(path: &Path, e: std::io::Error) -> FileSystemError {
        if e.kind() == std::io::ErrorKind::NotFound {
            FileSystemError::NotFound(path.display().to_string())
        } else {
            FileSystemError::IoError(e)
        }
    }
}

#[async_trait]
impl FileSystem for FileSystemAdapter {
    async fn exists(&self, path: &Path) -> bool {
        if self.check(path).await.is_err() {
            return false;
        }
        tokio::fs::metadata(path)
            .await
            .is_ok_and(|metadata| metadata.is_file())
    }

    async fn read(&self, path: &Path) -> FileSystemResult<Bytes> {
        self.check(path).await?;
        tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| Self::io_error(path, e))
    }

    async fn read_to_string(&self, path: &Path) -> FileSystemResult<String> {
        self.check(path).await?;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    async fn write(&self, path: &Path, contents: &str) -> FileSystemResult<()> {
        self.check(path).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(FileSystemError::IoError)?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(FileSystemError::IoError)
    }
}
