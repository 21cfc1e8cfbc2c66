//! # shaderport app
//!
//! Command-line driver for the export pipeline. Reads SPIR-V binaries named
//! on the command line into a [`ShaderCache`], then exports the cache into
//! the project directory.
//!
//! ```bash
//! shaderport --project my_game --shader fragment=lit.frag.spv
//! ```
//!
//! A GLSL source next to the binary (`lit.frag` for `lit.frag.spv`) is
//! recorded with the program and written to the debug directory.

mod args;

pub use args::{CliBackend, DEFAULT_CONFIG_FILE, ExportArgs, ShaderArg};

use std::fmt;
use std::path::{Path, PathBuf};

use shaderport_compiler::{Backend, ExportError, ExportReport, ExportSettings, ShaderExporter};
use shaderport_core::{CacheError, ShaderCache, ShaderLanguage};
use shaderport_vfs::FileSystemProvider;

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Failure of a whole `shaderport` run.
#[derive(Debug)]
pub enum AppError {
    /// A SPIR-V binary could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// A SPIR-V binary is not a whole number of words.
    Cache { path: PathBuf, source: CacheError },
    Export(ExportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Cache { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Cache { source, .. } => Some(source),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        Self::Export(err)
    }
}

/// Settings for this run: the settings file, then command-line overrides.
pub fn load_settings(args: &ExportArgs) -> Result<ExportSettings, AppError> {
    let mut settings = match args.config_file() {
        Some(file) => {
            log::info!("Loading settings from {}", file.display());
            ExportSettings::load(&file)?
        }
        None => ExportSettings::default(),
    };
    args.apply(&mut settings);
    Ok(settings)
}

/// Read every `--shader` binary into a fresh cache.
pub fn build_cache(shaders: &[ShaderArg]) -> Result<ShaderCache, AppError> {
    let cache = ShaderCache::new();
    for shader in shaders {
        let ir = std::fs::read(&shader.path).map_err(|source| AppError::Io {
            path: shader.path.clone(),
            source,
        })?;
        let source_code = sibling_source(&shader.path).unwrap_or_default();
        let hash = cache
            .insert(shader.stage, ShaderLanguage::Glsl, source_code, &ir)
            .map_err(|source| AppError::Cache {
                path: shader.path.clone(),
                source,
            })?;
        match hash {
            Some(hash) => log::debug!("{} -> {hash}", shader.path.display()),
            None => log::warn!("{} is empty, skipping", shader.path.display()),
        }
    }
    Ok(cache)
}

/// `lit.frag` for `lit.frag.spv`, if it exists.
fn sibling_source(spirv: &Path) -> Option<String> {
    if spirv.extension()? != "spv" {
        return None;
    }
    std::fs::read_to_string(spirv.with_extension("")).ok()
}

/// Run one export pass as described by `args`.
pub fn run(args: &ExportArgs) -> Result<ExportReport, AppError> {
    shaderport_core::init();
    let settings = load_settings(args)?;
    let cache = build_cache(&args.shaders)?;
    let backend = Backend::create(settings.backend, None)?;
    let storage = FileSystemProvider::new(&args.project);
    let exporter = ShaderExporter::new(Box::new(storage), settings, backend);
    Ok(exporter.export_shaders(&cache)?)
}
