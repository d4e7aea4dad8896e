//! Storage collaborators for asset bytes
//!
//! Paths handed to a source are always forward-slash separated and relative
//! to the source's root.

use std::{collections::HashMap, path::PathBuf};

use crate::error::{Result, ViewerError};

/// Reads raw asset bytes by relative path
pub trait AssetSource {
    fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// Replaces backslash separators so material files authored on Windows
/// resolve everywhere.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Filesystem-backed source rooted at the configured asset directory
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetSource for FsAssetSource {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.root.join(normalize_path(path));
        std::fs::read(&full_path).map_err(|source| ViewerError::AssetRead {
            path: full_path.display().to_string(),
            source,
        })
    }
}

/// In-memory source, handy for tests and embedded assets
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetSource {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(normalize_path(path), bytes.into());
    }

    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemoryAssetSource {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let key = normalize_path(path);
        self.files
            .get(&key)
            .cloned()
            .ok_or_else(|| ViewerError::AssetRead {
                path: key,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such asset"),
            })
    }
}
