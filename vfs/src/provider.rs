use crate::VfsError;
use crate::path;

/// Trait for storage backends holding the shader cache directory.
///
/// # Read vs Write
///
/// All providers must implement read operations (`read`, `exists`, `is_dir`,
/// `list_dir`). Write operations have default implementations that return
/// [`VfsError::ReadOnly`]. Providers that support writes override them and
/// return `false` from [`is_read_only()`](VfsProvider::is_read_only).
///
/// # Path Contract
///
/// Paths use forward slashes and are relative to the provider's root. The
/// empty path names the root itself and is accepted by `list_dir`, `is_dir`
/// and [`list_files_recursive`](VfsProvider::list_files_recursive).
pub trait VfsProvider: Send + Sync {
    // --- Read operations (required) ---

    /// Read the entire contents of a file at the given path.
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;

    /// Check whether a file or directory exists at the given path.
    fn exists(&self, path: &str) -> Result<bool, VfsError>;

    /// Check whether the given path is a directory.
    fn is_dir(&self, path: &str) -> Result<bool, VfsError>;

    /// List the immediate children of a directory, sorted by name.
    ///
    /// Returns file and directory names (not full paths).
    /// Returns an empty vec for non-existent directories.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError>;

    // --- Write operations (optional, default returns ReadOnly) ---

    /// Whether this provider is read-only.
    fn is_read_only(&self) -> bool {
        true
    }

    /// Write data to a file, creating or overwriting it.
    fn write(&self, _path: &str, _data: &[u8]) -> Result<(), VfsError> {
        Err(VfsError::ReadOnly)
    }

    /// Delete a file at the given path.
    fn delete(&self, _path: &str) -> Result<(), VfsError> {
        Err(VfsError::ReadOnly)
    }

    /// Create a directory and any missing parents.
    fn create_dir(&self, _path: &str) -> Result<(), VfsError> {
        Err(VfsError::ReadOnly)
    }

    /// Remove a directory and everything below it.
    fn remove_dir(&self, _path: &str) -> Result<(), VfsError> {
        Err(VfsError::ReadOnly)
    }

    // --- Provided ---

    /// Every file below `dir`, as full provider paths in sorted order.
    fn list_files_recursive(&self, dir: &str) -> Result<Vec<String>, VfsError> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_owned()];
        while let Some(current) = pending.pop() {
            for name in self.list_dir(&current)? {
                let child = path::join(&current, &name)?;
                if self.is_dir(&child)? {
                    pending.push(child);
                } else {
                    files.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}
