//! # shaderport compiler
//!
//! Offline export of engine shaders for a console target whose GPU toolchain
//! consumes PSSL instead of SPIR-V.
//!
//! Every entry of a [`ShaderCache`](shaderport_core::ShaderCache) goes through:
//!
//! 1. [`transpile`] - SPIR-V to HLSL
//! 2. [`rewrite`] - HLSL to PSSL
//! 3. [`vendor`] - PSSL to vendor bytecode, once per [`permutation`]
//! 4. [`reflect`] and [`mapping`] - IR bindings to vendor bind points
//! 5. [`container`] - binding metadata and programs in one file
//!
//! [`ShaderExporter`] drives the whole pass and writes the results through a
//! [`VfsProvider`](shaderport_vfs::VfsProvider).
//!
//! ## Example
//!
//! ```ignore
//! use shaderport_compiler::{Backend, ExportSettings, ShaderExporter};
//! use shaderport_vfs::FileSystemProvider;
//!
//! let settings = ExportSettings::default();
//! let backend = Backend::create(settings.backend, None)?;
//! let exporter = ShaderExporter::new(Box::new(FileSystemProvider::new("my_game")), settings, backend);
//! let report = exporter.export_shaders(&cache)?;
//! ```

pub mod backend;
pub mod config;
pub mod container;
pub mod error;
pub mod export;
pub mod mapping;
pub mod permutation;
pub mod pipeline;
pub mod reflect;
pub mod rewrite;
pub mod transpile;
pub mod vendor;

pub use backend::{Backend, DummyBackend, VendorBackend};
pub use config::{BackendType, CompilationConfiguration, ExportSettings, PrunePolicy};
pub use container::{CompiledShaderContainer, ContainerError};
pub use error::{CompileError, ExportError};
pub use export::{ExportReport, ShaderExporter};
pub use mapping::{BindingMap, BindingSlot, UniformType};
pub use permutation::{OutputPermutation, TargetOutputFormat};
pub use transpile::{NagaTranspiler, Transpiler};
