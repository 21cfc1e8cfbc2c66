//! Command line arguments.
//!
//! Parsed with clap into [`ExportArgs`], which [`run`](crate::run) consumes.
//! Command-line flags override values from the settings file.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use shaderport_compiler::{BackendType, ExportSettings, PrunePolicy};
use shaderport_core::ShaderStage;

/// Settings file looked up in the project directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "shaderport.toml";

/// Backend selection for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliBackend {
    /// In-process reference toolchain; needs no SDK.
    Dummy,
    /// Platform SDK registered by the embedding tool.
    Vendor,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Dummy => BackendType::Dummy,
            CliBackend::Vendor => BackendType::Vendor,
        }
    }
}

/// A `--shader <stage>=<path>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderArg {
    pub stage: ShaderStage,
    /// SPIR-V binary.
    pub path: PathBuf,
}

impl FromStr for ShaderArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <stage>=<path>, got '{s}'"))?;
        if path.is_empty() {
            return Err(format!("missing SPIR-V path in '{s}'"));
        }
        Ok(Self {
            stage: stage.parse()?,
            path: PathBuf::from(path),
        })
    }
}

/// shaderport export arguments.
#[derive(Parser, Debug)]
#[command(
    name = "shaderport",
    about = "Export SPIR-V shaders as PSSL containers",
    long_about = "Compiles every SPIR-V program given with --shader into a PSSL shader \
        container under the project's output directory.\n\n\
        EXAMPLES:\n\
          # Export two shaders with the reference backend\n\
          shaderport --project my_game --shader vertex=mesh.vert.spv --shader fragment=mesh.frag.spv\n\
        \n\
          # Rebuild everything from scratch\n\
          shaderport --project my_game --clean --shader compute=cull.comp.spv",
    version
)]
pub struct ExportArgs {
    /// Project root; output paths are relative to it.
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Settings file (TOML). Defaults to <project>/shaderport.toml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Vendor toolchain to compile with.
    #[arg(long, value_enum)]
    pub backend: Option<CliBackend>,

    /// SPIR-V program to export, as <stage>=<path>. Repeatable.
    #[arg(long = "shader", value_name = "STAGE=PATH")]
    pub shaders: Vec<ShaderArg>,

    /// Delete the output directory before exporting.
    #[arg(long)]
    pub clean: bool,

    /// Do not write the GLSL/HLSL/PSSL debug sources.
    #[arg(long)]
    pub no_debug_sources: bool,
}

impl ExportArgs {
    /// Settings file to load, if any.
    pub fn config_file(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = self.project.join(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        }
    }

    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut ExportSettings) {
        if let Some(backend) = self.backend {
            settings.backend = backend.into();
        }
        if self.clean {
            settings.prune = PrunePolicy::ClearAll;
        }
        if self.no_debug_sources {
            settings.write_debug_sources = false;
        }
    }
}
