//! Storage abstraction for the shaderport output cache.
//!
//! The exporter never touches `std::fs` directly; it writes containers, debug
//! databases and intermediate sources through a [`VfsProvider`]. This keeps the
//! whole export pass testable against an in-memory tree.
//!
//! # Providers
//!
//! - [`FileSystemProvider`]: a directory on disk (read-write, native only)
//! - [`MemoryProvider`]: in-memory storage for tests (read-write)
//!
//! All operations are blocking. An export pass is a sequential build step and
//! has no use for suspension points.
//!
//! # Read-Only vs Read-Write
//!
//! All providers must implement read operations. Write operations are optional
//! and default to returning [`VfsError::ReadOnly`]. Use
//! [`VfsProvider::is_read_only()`] to check capability.

mod error;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
mod filesystem;
mod memory;
pub mod path;
mod provider;

pub use error::VfsError;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
pub use filesystem::FileSystemProvider;
pub use memory::MemoryProvider;
pub use provider::VfsProvider;
