use std::fmt;

/// Errors raised by storage providers.
#[derive(Debug)]
pub enum VfsError {
    /// Nothing exists at this provider path.
    NotFound(String),
    /// Disk access failed for the given provider path.
    Io { path: String, source: std::io::Error },
    /// Empty path or a path escaping the provider root.
    InvalidPath(String),
    /// The provider does not accept writes.
    ReadOnly,
}

impl VfsError {
    /// Attach `path` to an IO failure. Missing files become [`VfsError::NotFound`].
    pub fn io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_owned())
        } else {
            Self::Io {
                path: path.to_owned(),
                source,
            }
        }
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "not found: {path}"),
            Self::Io { path, source } => write!(f, "{path}: {source}"),
            Self::InvalidPath(reason) => write!(f, "invalid path: {reason}"),
            Self::ReadOnly => write!(f, "storage is read-only"),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
