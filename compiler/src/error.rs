//! Export error types.
//!
//! [`CompileError`] is local to one cache entry: the exporter logs it, skips
//! the entry and moves on. [`ExportError`] aborts the whole pass.

use std::fmt;

use shaderport_core::ShaderStage;
use shaderport_vfs::VfsError;

/// Failure while turning one cache entry into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The IR could not be decompiled to HLSL.
    TranspileFailed(String),
    /// The vendor toolchain has no profile for this stage.
    UnsupportedStage(ShaderStage),
    /// The vendor compiler produced an empty program.
    VendorCompileFailed { errors: usize },
    /// The program reflection contains a buffer class the mapper cannot place.
    UnsupportedResourceType(String),
    /// The IR declares a descriptor kind the mapper cannot encode.
    UnsupportedDescriptorKind(String),
    /// IR and vendor disagree on the push-constant block size.
    PushConstantSizeMismatch { name: String, ir: u32, vendor: u32 },
    /// A vertex input uses a semantic other than `TEXCOORD<n>`.
    SemanticConvention(String),
    /// A name matched both a read-only and a read-write vendor resource.
    AmbiguousResource(String),
    /// A vendor resource has no IR declaration mapped to it.
    UnmappedVendorResource { category: &'static str, name: String },
    /// A set, binding, element or bind point does not fit its packed field.
    BindingOutOfRange(String),
    /// Vendor bytecode could not be read back.
    InvalidProgram(String),
    /// The IR could not be reflected.
    Reflection(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TranspileFailed(msg) => write!(f, "transpile failed: {msg}"),
            Self::UnsupportedStage(stage) => write!(f, "unsupported shader stage: {stage}"),
            Self::VendorCompileFailed { errors } => {
                write!(f, "vendor compile failed with {errors} error(s)")
            }
            Self::UnsupportedResourceType(ty) => write!(f, "unsupported resource type: {ty}"),
            Self::UnsupportedDescriptorKind(kind) => {
                write!(f, "unsupported descriptor type: {kind}")
            }
            Self::PushConstantSizeMismatch { name, ir, vendor } => write!(
                f,
                "push constant '{name}' size mismatch: IR declares {ir} bytes, vendor {vendor}"
            ),
            Self::SemanticConvention(name) => {
                write!(f, "vertex semantic '{name}' does not follow the TEXCOORD convention")
            }
            Self::AmbiguousResource(name) => write!(
                f,
                "resource '{name}' matches both read-only and read-write vendor resources"
            ),
            Self::UnmappedVendorResource { category, name } => {
                write!(f, "{category} '{name}' has no matching IR declaration")
            }
            Self::BindingOutOfRange(msg) => write!(f, "binding out of range: {msg}"),
            Self::InvalidProgram(msg) => write!(f, "invalid program: {msg}"),
            Self::Reflection(msg) => write!(f, "reflection failed: {msg}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Failure that aborts the whole export pass.
#[derive(Debug)]
pub enum ExportError {
    /// The output directory could not be created, listed or written.
    Storage(VfsError),
    /// Export settings could not be loaded.
    Config(String),
    /// The configured backend cannot be constructed.
    BackendUnavailable(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "shader cache storage error: {err}"),
            Self::Config(msg) => write!(f, "invalid export settings: {msg}"),
            Self::BackendUnavailable(msg) => write!(f, "backend unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VfsError> for ExportError {
    fn from(err: VfsError) -> Self {
        Self::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompileError::UnsupportedStage(ShaderStage::TessellationControl);
        assert_eq!(err.to_string(), "unsupported shader stage: tess-control");

        let err = CompileError::PushConstantSizeMismatch {
            name: "pc".into(),
            ir: 32,
            vendor: 16,
        };
        assert_eq!(
            err.to_string(),
            "push constant 'pc' size mismatch: IR declares 32 bytes, vendor 16"
        );
    }

    #[test]
    fn storage_error_has_source() {
        use std::error::Error;
        let err = ExportError::from(VfsError::ReadOnly);
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            format!("shader cache storage error: {}", VfsError::ReadOnly)
        );
    }
}
