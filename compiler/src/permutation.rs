//! Fragment output-format permutations.
//!
//! SPIR-V lets the engine bind a render target of any format to a fragment
//! output, but PSSL bakes the export format into the program. A fragment
//! shader with `N` located outputs is therefore compiled once per combination
//! of the configured formats (`formats.len() ^ N` programs), each selected at
//! draw time by its permutation id.
//!
//! The id packs one 4-bit [`TargetOutputFormat`] per target, target 0 in the
//! lowest nibble.

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Render-target export format of a pixel shader output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum TargetOutputFormat {
    NoExports = 0,
    R32 = 1,
    G32R32 = 2,
    A32R32 = 3,
    Fp16Abgr = 4,
    Unorm16Abgr = 5,
    Snorm16Abgr = 6,
    Uint16Abgr = 7,
    Sint16Abgr = 8,
    A32B32G32R32 = 9,
}

impl TargetOutputFormat {
    /// Numeric mode stored in the permutation id.
    pub fn mode(self) -> u32 {
        self as u32
    }

    /// Spelling used by `#pragma PSSL_target_output_format`.
    pub fn pragma_name(self) -> &'static str {
        match self {
            Self::NoExports | Self::Fp16Abgr => "FMT_FP16_ABGR",
            Self::R32 => "FMT_32_R",
            Self::G32R32 => "FMT_32_GR",
            Self::A32R32 => "FMT_32_AR",
            Self::Unorm16Abgr => "FMT_UNORM16_ABGR",
            Self::Snorm16Abgr => "FMT_SNORM16_ABGR",
            Self::Uint16Abgr => "FMT_UINT16_ABGR",
            Self::Sint16Abgr => "FMT_SINT16_ABGR",
            Self::A32B32G32R32 => "FMT_32_ABGR",
        }
    }
}

/// Formats compiled for every fragment output unless configured otherwise.
///
/// Both export at full rate; 128-bit formats halve it and are left out.
pub const DEFAULT_OUTPUT_FORMATS: [TargetOutputFormat; 2] =
    [TargetOutputFormat::Fp16Abgr, TargetOutputFormat::R32];

/// Most render targets a permutation id can describe.
pub const MAX_OUTPUT_TARGETS: u32 = 8;

/// One output-format combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPermutation {
    pub id: u32,
    /// Format per render target, indexed by target.
    pub formats: Vec<TargetOutputFormat>,
}

impl OutputPermutation {
    /// The permutation of a shader without per-target formats.
    pub fn base() -> Self {
        Self {
            id: 0,
            formats: Vec::new(),
        }
    }

    /// Prefix `source` with one format pragma per target.
    ///
    /// The last target's pragma comes first.
    pub fn apply(&self, source: &str) -> String {
        let mut out = String::new();
        for (target, format) in self.formats.iter().enumerate().rev() {
            out.push_str(&format!(
                "#pragma PSSL_target_output_format(target {target} {})\n",
                format.pragma_name()
            ));
        }
        out.push_str(source);
        out
    }
}

/// Every combination of `formats` across `targets` outputs.
///
/// Target 0 varies slowest. Zero targets yield just the base permutation.
pub fn generate_permutations(
    formats: &[TargetOutputFormat],
    targets: u32,
) -> Result<Vec<OutputPermutation>, CompileError> {
    if targets > MAX_OUTPUT_TARGETS {
        return Err(CompileError::BindingOutOfRange(format!(
            "{targets} fragment outputs exceed the {MAX_OUTPUT_TARGETS} a permutation id can hold"
        )));
    }
    if targets == 0 || formats.is_empty() {
        return Ok(vec![OutputPermutation::base()]);
    }

    let mut permutations = Vec::new();
    let mut current = vec![formats[0]; targets as usize];
    collect(formats, 0, &mut current, &mut permutations);
    Ok(permutations)
}

fn collect(
    formats: &[TargetOutputFormat],
    target: usize,
    current: &mut Vec<TargetOutputFormat>,
    out: &mut Vec<OutputPermutation>,
) {
    if target == current.len() {
        let id = current
            .iter()
            .enumerate()
            .fold(0u32, |id, (i, f)| id | (f.mode() << (i * 4)));
        out.push(OutputPermutation {
            id,
            formats: current.clone(),
        });
        return;
    }
    for &format in formats {
        current[target] = format;
        collect(formats, target + 1, current, out);
    }
}
