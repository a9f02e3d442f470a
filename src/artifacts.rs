//! Artifact store backed by the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use compiler_engine::{ArtifactError, ArtifactStore};

const FILE_SCHEME: &str = "file://";

/// Resolves `file://` URIs and bare paths, optionally relative to a root directory.
#[derive(Debug, Clone, Default)]
pub struct FileArtifactStore {
    root: Option<PathBuf>,
}

impl FileArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, uri: &str) -> Result<PathBuf, ArtifactError> {
        let path = match uri.strip_prefix(FILE_SCHEME) {
            Some(path) => path,
            None if uri.contains("://") => {
                return Err(ArtifactError::new(uri, "unsupported URI scheme"));
            }
            None => uri,
        };
        if path.is_empty() {
            return Err(ArtifactError::new(uri, "empty path"));
        }

        let path = Path::new(path);
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl ArtifactStore for FileArtifactStore {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.resolve(uri)?;
        fs::read(&path).map_err(|error| {
            ArtifactError::new(uri, format!("failed to read {}: {error}", path.display()))
        })
    }
}
