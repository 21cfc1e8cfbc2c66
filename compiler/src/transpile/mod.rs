//! SPIR-V to HLSL decompilation.
//!
//! The [`Transpiler`] is the first stage of the export pipeline. The default
//! [`NagaTranspiler`] parses the IR with naga's SPIR-V front end, validates it
//! and writes shader-model 5.0 HLSL, then normalises the few spellings the
//! PSSL rewriter and the binding mapper rely on:
//!
//! - uniform blocks are declared as `cbuffer <BlockTypeName>`, so the vendor
//!   reflection reports the block type name the IR reflection matches on;
//! - user varyings carry `TEXCOORD<n>` semantics instead of naga's `LOC<n>`;
//! - samplers split off combined image-samplers are declared at the combined
//!   slot, `register(s<binding>)` next to the image's `register(t<binding>)`.

mod split;

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::Regex;

pub use split::{SplitModule, SplitSampler, has_combined_samplers, split_combined_samplers};

use crate::error::CompileError;

/// Name of the entry point every cached program must export.
pub const ENTRY_POINT: &str = "main";

/// Decompiles SPIR-V into HLSL source text.
pub trait Transpiler: Send + Sync {
    /// Decompile one SPIR-V program.
    ///
    /// Malformed IR is reported as [`CompileError::TranspileFailed`]; it must
    /// never abort the caller.
    fn transpile(&self, words: &[u32]) -> Result<String, CompileError>;
}

/// [`Transpiler`] backed by naga's `spv-in` and `hlsl-out`.
pub struct NagaTranspiler {
    shader_model: naga::back::hlsl::ShaderModel,
}

impl NagaTranspiler {
    pub fn new() -> Self {
        Self {
            shader_model: naga::back::hlsl::ShaderModel::V5_0,
        }
    }

    fn decompile(&self, words: &[u32]) -> Result<String, CompileError> {
        let options = naga::front::spv::Options {
            adjust_coordinate_space: false,
            strict_capabilities: false,
            block_ctx_dump_prefix: None,
        };
        let module = naga::front::spv::Frontend::new(words.iter().cloned(), &options)
            .parse()
            .map_err(|e| CompileError::TranspileFailed(format!("SPIR-V parse error: {e:?}")))?;

        if !module.entry_points.iter().any(|ep| ep.name == ENTRY_POINT) {
            return Err(CompileError::TranspileFailed(format!(
                "entry point '{ENTRY_POINT}' not found"
            )));
        }

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| CompileError::TranspileFailed(format!("Validation error: {e:?}")))?;

        let options = naga::back::hlsl::Options {
            shader_model: self.shader_model,
            fake_missing_bindings: true,
            push_constants_target: Some(naga::back::hlsl::BindTarget {
                space: 0,
                register: 0,
                binding_array_size: None,
            }),
            ..Default::default()
        };
        let mut hlsl = String::new();
        naga::back::hlsl::Writer::new(&mut hlsl, &options)
            .write(&module, &info, None)
            .map_err(|e| CompileError::TranspileFailed(format!("HLSL generation error: {e:?}")))?;
        Ok(hlsl)
    }
}

impl Default for NagaTranspiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Transpiler for NagaTranspiler {
    fn transpile(&self, words: &[u32]) -> Result<String, CompileError> {
        let split;
        let (words, samplers) = if has_combined_samplers(words) {
            split = split_combined_samplers(words)?;
            (split.words.as_slice(), split.samplers.as_slice())
        } else {
            (words, &[][..])
        };

        let hlsl = panic::catch_unwind(AssertUnwindSafe(|| self.decompile(words)))
            .map_err(|payload| {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "decompiler panicked".into());
                CompileError::TranspileFailed(msg)
            })??;

        log::trace!("Decompiled {} words into {} bytes of HLSL", words.len(), hlsl.len());
        Ok(restore_sampler_registers(&normalize_hlsl(&hlsl), samplers))
    }
}

static NAMED_CBUFFER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cbuffer\s+(\w+)(\s*:\s*register\([^)]*\))?\s*\{\s*(\w+)\s+(\w+)\s*;\s*\}")
        .expect("invalid cbuffer pattern")
});

static LOCATION_SEMANTIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*LOC(\d+)\b").expect("invalid location pattern"));

/// Rename single-member cbuffers after their block type and turn location
/// semantics into `TEXCOORD<n>`.
fn normalize_hlsl(hlsl: &str) -> String {
    let renamed = NAMED_CBUFFER.replace_all(hlsl, |caps: &regex::Captures| {
        if caps[1] == caps[4] {
            format!(
                "cbuffer {}{} {{ {} {}; }}",
                &caps[3],
                caps.get(2).map_or("", |m| m.as_str()),
                &caps[3],
                &caps[4]
            )
        } else {
            caps[0].to_string()
        }
    });
    LOCATION_SEMANTIC
        .replace_all(&renamed, ": TEXCOORD$1")
        .into_owned()
}

static SAMPLER_REGISTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Sampler(?:Comparison)?State\s+\w+\s*:\s*register\(\s*s)(\d+)(\s*(?:,\s*space(\d+)\s*)?\))")
        .expect("invalid sampler register pattern")
});

/// Move split samplers from the binding naga saw back to the combined one.
fn restore_sampler_registers(hlsl: &str, samplers: &[SplitSampler]) -> String {
    if samplers.is_empty() {
        return hlsl.to_owned();
    }
    SAMPLER_REGISTER
        .replace_all(hlsl, |caps: &regex::Captures| {
            let register: u32 = caps[2].parse().unwrap_or(u32::MAX);
            let space: u32 = caps.get(4).map_or(0, |m| m.as_str().parse().unwrap_or(u32::MAX));
            match samplers
                .iter()
                .find(|s| s.set == space && s.binding == register)
            {
                Some(sampler) => format!("{}{}{}", &caps[1], sampler.combined_binding, &caps[3]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
