use std::path::PathBuf;

use crate::VfsError;
use crate::provider::VfsProvider;

/// Provider backed by a directory on disk, usually the project root.
///
/// The root path is joined with the provider path to form the actual
/// filesystem path. Callers build paths with [`path::join`](crate::path::join),
/// which rejects `..` segments before they reach the provider.
///
/// # Example
///
/// ```ignore
/// let project = FileSystemProvider::new("./my_game");
/// project.create_dir(".shaders/debug")?;
/// project.write(".shaders/0123abcd.sp", &container)?;
/// ```
pub struct FileSystemProvider {
    root: PathBuf,
}

impl FileSystemProvider {
    /// Create a provider rooted at the given directory.
    ///
    /// The directory does not need to exist yet; it is checked at read/write
    /// time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl VfsProvider for FileSystemProvider {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        std::fs::read(self.resolve(path)).map_err(|e| VfsError::io(path, e))
    }

    fn exists(&self, path: &str) -> Result<bool, VfsError> {
        Ok(self.resolve(path).exists())
    }

    fn is_dir(&self, path: &str) -> Result<bool, VfsError> {
        Ok(self.resolve(path).is_dir())
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let full_path = self.resolve(path);
        if !full_path.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let dir = std::fs::read_dir(full_path).map_err(|e| VfsError::io(path, e))?;
        for entry in dir {
            let entry = entry.map_err(|e| VfsError::io(path, e))?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_owned());
            } else {
                log::warn!("Skipping non UTF-8 file name in {path:?}");
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VfsError::io(path, e))?;
        }
        std::fs::write(full_path, data).map_err(|e| VfsError::io(path, e))
    }

    fn delete(&self, path: &str) -> Result<(), VfsError> {
        std::fs::remove_file(self.resolve(path)).map_err(|e| VfsError::io(path, e))
    }

    fn create_dir(&self, path: &str) -> Result<(), VfsError> {
        std::fs::create_dir_all(self.resolve(path)).map_err(|e| VfsError::io(path, e))
    }

    fn remove_dir(&self, path: &str) -> Result<(), VfsError> {
        std::fs::remove_dir_all(self.resolve(path)).map_err(|e| VfsError::io(path, e))
    }
}
