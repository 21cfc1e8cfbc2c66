//! Per-entry compile chain.
//!
//! Transpiler → Rewriter → Vendor Compiler Adapter → Mapper → Serializer, all
//! in memory. The chain is split in two so the exporter can write the
//! intermediate sources before the vendor compiler runs: [`translate`]
//! produces HLSL and PSSL, [`ShaderPipeline::compile`] everything after.
//!
//! [`translate`]: ShaderPipeline::translate

use shaderport_core::{ShaderCacheEntry, ShaderStage};

use crate::backend::Backend;
use crate::config::{CompilationConfiguration, ExportSettings};
use crate::container::{CompiledShaderContainer, ContainerProgram};
use crate::error::CompileError;
use crate::mapping::{self, BindingMap, SourceNames};
use crate::permutation::{self, OutputPermutation};
use crate::reflect;
use crate::rewrite;
use crate::transpile::Transpiler;
use crate::vendor::{self, CompiledProgram, ProgramReader};

/// Intermediate sources of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub hlsl: String,
    pub pssl: String,
    pub config: CompilationConfiguration,
}

/// A debug database produced for one permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugDatabase {
    pub permutation: u32,
    pub data: Vec<u8>,
    /// Extension including the dot.
    pub extension: String,
}

/// Everything written for one successfully compiled entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEntry {
    pub container: Vec<u8>,
    pub bindings: BindingMap,
    /// Empty when the backend produced none.
    pub debug_databases: Vec<DebugDatabase>,
}

/// The compile chain for one export pass.
pub struct ShaderPipeline<'a> {
    transpiler: &'a dyn Transpiler,
    backend: &'a Backend,
    settings: &'a ExportSettings,
}

impl<'a> ShaderPipeline<'a> {
    pub fn new(
        transpiler: &'a dyn Transpiler,
        backend: &'a Backend,
        settings: &'a ExportSettings,
    ) -> Self {
        Self {
            transpiler,
            backend,
            settings,
        }
    }

    /// SPIR-V → HLSL → PSSL.
    pub fn translate(&self, entry: &ShaderCacheEntry) -> Result<Translation, CompileError> {
        shaderport_core::profile_function!();
        let mut config = CompilationConfiguration::new(entry.stage);
        let hlsl = {
            shaderport_core::profile_scope!("transpile");
            self.transpiler.transpile(&entry.program)?
        };
        let pssl = {
            shaderport_core::profile_scope!("rewrite");
            rewrite::hlsl_to_pssl(&hlsl, &mut config)
        };
        Ok(Translation { hlsl, pssl, config })
    }

    /// PSSL → vendor programs → binding tables → container bytes.
    ///
    /// Any failing permutation fails the whole entry.
    pub fn compile(
        &self,
        entry: &ShaderCacheEntry,
        translation: &Translation,
    ) -> Result<CompiledEntry, CompileError> {
        shaderport_core::profile_function!();
        let ir = reflect::reflect(&entry.program)?;

        let permutations = self.permutations(entry.stage, ir.output_count)?;
        let mut programs: Vec<CompiledProgram> = Vec::with_capacity(permutations.len());
        for permutation in &permutations {
            shaderport_core::profile_scope!("vendor compile");
            let source = permutation.apply(&translation.pssl);
            programs.push(vendor::compile(
                self.backend,
                &source,
                translation.config.stage,
                translation.config.unroll,
                permutation.id,
            )?);
        }

        let first = programs
            .first()
            .ok_or_else(|| CompileError::InvalidProgram("no program compiled".into()))?;
        let program = self.backend.load(&first.program)?;
        let bindings = {
            shaderport_core::profile_scope!("map bindings");
            mapping::map_bindings(&ir, &program, &SourceNames::parse(&translation.hlsl))?
        };

        let debug_databases = programs
            .iter()
            .filter(|p| !p.sdb.is_empty())
            .map(|p| DebugDatabase {
                permutation: p.permutation,
                data: p.sdb.clone(),
                extension: p.sdb_ext.clone(),
            })
            .collect();
        let container = CompiledShaderContainer::new(
            &bindings,
            programs
                .into_iter()
                .map(|p| ContainerProgram {
                    permutation: p.permutation,
                    bytecode: p.program,
                })
                .collect(),
        );

        Ok(CompiledEntry {
            container: container.to_bytes(),
            bindings,
            debug_databases,
        })
    }

    /// Output-format permutations to compile for a shader.
    fn permutations(
        &self,
        stage: ShaderStage,
        outputs: u32,
    ) -> Result<Vec<OutputPermutation>, CompileError> {
        if stage == ShaderStage::Fragment && self.settings.output_permutations {
            permutation::generate_permutations(&self.settings.output_formats, outputs)
        } else {
            Ok(vec![OutputPermutation::base()])
        }
    }
}
