//! PSSL toolchain backends.
//!
//! The exporter talks to exactly one [`Backend`], chosen from
//! [`BackendType`] when the exporter is built.
//!
//! # Available Backends
//!
//! - `dummy` (default): in-process reference toolchain, see [`DummyBackend`]
//! - `vendor`: the platform SDK, supplied by the embedding tool as a
//!   [`VendorBackend`] implementation

pub mod dummy;

pub use dummy::DummyBackend;

use crate::config::BackendType;
use crate::error::{CompileError, ExportError};
use crate::vendor::{CompileOptions, CompilerOutput, Program, ProgramReader, PsslCompiler, SourceProvider};

/// A full vendor toolchain: compiler plus bytecode reader.
pub trait VendorBackend: PsslCompiler + ProgramReader + Send + Sync {
    /// Name shown in logs.
    fn name(&self) -> &'static str {
        "Vendor Backend"
    }
}

/// The toolchain the exporter compiles with.
pub enum Backend {
    Dummy(DummyBackend),
    Vendor(Box<dyn VendorBackend>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(_) => write!(f, "Backend::Dummy"),
            Self::Vendor(backend) => write!(f, "Backend::Vendor({})", backend.name()),
        }
    }
}

impl Backend {
    /// Build the backend selected by `backend_type`.
    ///
    /// `vendor` is whatever SDK binding the embedding tool registered; asking
    /// for the vendor backend without one fails.
    pub fn create(
        backend_type: BackendType,
        vendor: Option<Box<dyn VendorBackend>>,
    ) -> Result<Self, ExportError> {
        match (backend_type, vendor) {
            (BackendType::Dummy, _) => {
                log::info!("Using dummy backend");
                Ok(Self::Dummy(DummyBackend::new()))
            }
            (BackendType::Vendor, Some(vendor)) => {
                log::info!("Using {}", vendor.name());
                Ok(Self::Vendor(vendor))
            }
            (BackendType::Vendor, None) => Err(ExportError::BackendUnavailable(
                "no vendor toolchain registered".into(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dummy(backend) => backend.name(),
            Self::Vendor(backend) => backend.name(),
        }
    }
}

impl PsslCompiler for Backend {
    fn run(&self, options: &CompileOptions, sources: &dyn SourceProvider) -> CompilerOutput {
        match self {
            Self::Dummy(backend) => backend.run(options, sources),
            Self::Vendor(backend) => backend.run(options, sources),
        }
    }
}

impl ProgramReader for Backend {
    fn load(&self, bytecode: &[u8]) -> Result<Program, CompileError> {
        match self {
            Self::Dummy(backend) => backend.load(bytecode),
            Self::Vendor(backend) => backend.load(bytecode),
        }
    }
}
