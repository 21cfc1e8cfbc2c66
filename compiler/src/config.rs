//! Export settings.
//!
//! [`ExportSettings`] is loaded once per run, usually from a TOML file next to
//! the project:
//!
//! ```toml
//! output_dir = ".shaders"
//! write_debug_sources = false
//! prune = "clear-all"
//! output_formats = ["fp16-abgr", "r32"]
//! backend = "dummy"
//! ```
//!
//! [`CompilationConfiguration`] is the per-entry state threaded through the
//! pipeline and dropped when the entry is done.

use std::path::Path;

use serde::{Deserialize, Serialize};
use shaderport_core::ShaderStage;
use shaderport_vfs::path;

use crate::error::ExportError;
use crate::permutation::{DEFAULT_OUTPUT_FORMATS, TargetOutputFormat};

/// Per-entry compile settings, derived from the cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilationConfiguration {
    /// Ask the vendor compiler to fully unroll every loop.
    pub unroll: bool,
    pub stage: ShaderStage,
}

impl CompilationConfiguration {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            unroll: false,
            stage,
        }
    }
}

/// What happens to files already in the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrunePolicy {
    /// Keep files of entries still in the cache, delete everything else after the pass.
    #[default]
    KeepCurrent,
    /// Delete the whole output directory before the pass.
    ClearAll,
}

/// Which vendor toolchain compiles the PSSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// The in-process reference toolchain.
    #[default]
    Dummy,
    /// SDK bindings registered by the embedding tool.
    Vendor,
}

/// Settings for one export pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    /// Output directory, relative to the storage root.
    pub output_dir: String,
    /// Directory for intermediate sources, relative to `output_dir`.
    pub debug_dir: String,
    /// Container file extension, without the dot.
    pub container_extension: String,
    pub write_debug_sources: bool,
    pub write_debug_database: bool,
    /// Leave entries whose container already exists untouched.
    pub skip_up_to_date: bool,
    pub prune: PrunePolicy,
    /// Compile fragment shaders once per output-format combination.
    pub output_permutations: bool,
    pub output_formats: Vec<TargetOutputFormat>,
    pub backend: BackendType,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: ".shaders".into(),
            debug_dir: "debug".into(),
            container_extension: "sp".into(),
            write_debug_sources: true,
            write_debug_database: true,
            skip_up_to_date: true,
            prune: PrunePolicy::KeepCurrent,
            output_permutations: true,
            output_formats: DEFAULT_OUTPUT_FORMATS.to_vec(),
            backend: BackendType::Dummy,
        }
    }
}

impl ExportSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, ExportError> {
        let settings: Self = toml::from_str(text).map_err(|e| ExportError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file.
    pub fn load(file: &Path) -> Result<Self, ExportError> {
        let text = std::fs::read_to_string(file)
            .map_err(|e| ExportError::Config(format!("{}: {e}", file.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ExportError> {
        toml::to_string(self).map_err(|e| ExportError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), ExportError> {
        path::normalize(&self.output_dir).map_err(|e| ExportError::Config(format!("output_dir: {e}")))?;
        self.debug_path()
            .map_err(|e| ExportError::Config(format!("debug_dir: {e}")))?;
        if self.container_extension.is_empty() || self.container_extension.contains(['.', '/']) {
            return Err(ExportError::Config(format!(
                "container_extension '{}' must be a bare extension",
                self.container_extension
            )));
        }
        Ok(())
    }

    /// Normalized output directory.
    pub fn output_path(&self) -> Result<String, shaderport_vfs::VfsError> {
        path::normalize(&self.output_dir)
    }

    /// Normalized debug directory.
    pub fn debug_path(&self) -> Result<String, shaderport_vfs::VfsError> {
        path::join(&self.output_path()?, &self.debug_dir)
    }
}
