use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::VfsError;
use crate::provider::VfsProvider;

#[derive(Default)]
struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryTree {
    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() || self.dirs.contains(path) {
            return true;
        }
        let prefix = format!("{path}/");
        self.files.keys().any(|k| k.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

/// In-memory provider for tests.
///
/// Cloning shares the underlying tree, so a test can hand one clone to the
/// exporter and inspect the other afterwards.
///
/// Directories exist when created explicitly or whenever a file path
/// contains that directory prefix.
///
/// # Example
///
/// ```ignore
/// let mem = MemoryProvider::new();
/// mem.insert(".shaders/stale.sp", vec![0; 16]);
/// exporter.export_shaders(&cache)?;
/// assert!(mem.get(".shaders/stale.sp").is_none());
/// ```
#[derive(Clone, Default)]
pub struct MemoryProvider {
    tree: Arc<RwLock<MemoryTree>>,
}

impl MemoryProvider {
    /// Create an empty in-memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file at the given path, overwriting any existing file.
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        self.tree.write().files.insert(path.into(), data);
    }

    /// Contents of a file, if present.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.tree.read().files.get(path).cloned()
    }

    /// Paths of every stored file, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.tree.read().files.keys().cloned().collect()
    }

    /// Remove a file at the given path, returning its data if it existed.
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.tree.write().files.remove(path)
    }
}

impl VfsProvider for MemoryProvider {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.get(path).ok_or_else(|| VfsError::NotFound(path.to_owned()))
    }

    fn exists(&self, path: &str) -> Result<bool, VfsError> {
        let tree = self.tree.read();
        Ok(tree.files.contains_key(path) || tree.is_dir(path))
    }

    fn is_dir(&self, path: &str) -> Result<bool, VfsError> {
        Ok(self.tree.read().is_dir(path))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let tree = self.tree.read();
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut children = BTreeSet::new();
        for key in tree.files.keys().chain(tree.dirs.iter()) {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let child = match rest.find('/') {
                    Some(pos) => &rest[..pos],
                    None => rest,
                };
                if !child.is_empty() {
                    children.insert(child.to_owned());
                }
            }
        }
        Ok(children.into_iter().collect())
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.tree.write().files.insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), VfsError> {
        self.tree
            .write()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| VfsError::NotFound(path.to_owned()))
    }

    fn create_dir(&self, path: &str) -> Result<(), VfsError> {
        self.tree.write().dirs.insert(path.to_owned());
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<(), VfsError> {
        let mut tree = self.tree.write();
        if !tree.is_dir(path) {
            return Err(VfsError::NotFound(path.to_owned()));
        }
        let prefix = format!("{path}/");
        tree.files.retain(|k, _| !k.starts_with(&prefix));
        tree.dirs.retain(|d| d.as_str() != path && !d.starts_with(&prefix));
        Ok(())
    }
}
