//! Where shader bytes come from.
//!
//! A `ShaderSource` enumerates the files under a root and reads them by
//! path. `DirShaderSource` walks a directory on disk; `MemoryShaderSource`
//! serves a fixed set of files, for tests and embedded builds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ShaderSourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("no shader file at {0}")]
    NotFound(PathBuf),
}

pub trait ShaderSource {
    /// Every file below `root`, sorted by path.
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ShaderSourceError>;

    fn read(&self, path: &Path) -> Result<Vec<u8>, ShaderSourceError>;
}

/// Shader files on disk, relative to a base directory.
#[derive(Debug, Clone)]
pub struct DirShaderSource {
    base: PathBuf,
}

impl DirShaderSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ShaderSource for DirShaderSource {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ShaderSourceError> {
        let dir = self.base.join(root);
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|source| ShaderSourceError::Walk {
                root: dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.base)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(rel);
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ShaderSourceError> {
        let full = self.base.join(path);
        std::fs::read(&full).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ShaderSourceError::NotFound(path.to_path_buf())
            } else {
                ShaderSourceError::Io {
                    path: full,
                    source,
                }
            }
        })
    }
}

/// In-memory shader files keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryShaderSource {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryShaderSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl ShaderSource for MemoryShaderSource {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ShaderSourceError> {
        Ok(self
            .files
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ShaderSourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ShaderSourceError::NotFound(path.to_path_buf()))
    }
}
