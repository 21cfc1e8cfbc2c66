//! # shaderport core
//!
//! Types shared by every shaderport crate: pipeline stages, the
//! content-addressed [`ShaderCache`](cache::ShaderCache) the engine fills while
//! scanning a project, and profiling macros.

pub mod cache;
pub mod profiling;
pub mod stage;

pub use cache::{CacheError, CacheSnapshot, ShaderCache, ShaderCacheEntry, SourceCompiler};
pub use stage::{ShaderLanguage, ShaderStage};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at tool start-up.
pub fn init() {
    log::info!("shaderport core v{} initialized", VERSION);
}
