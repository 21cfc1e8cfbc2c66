//! Export pass over a shader cache.
//!
//! [`ShaderExporter`] walks a snapshot of the [`ShaderCache`], runs every
//! entry through the [`ShaderPipeline`] and writes one container per entry
//! into the output directory:
//!
//! ```text
//! <output_dir>/<hash>.sp
//! <output_dir>/<hash>.sdb                  (debug database, one permutation)
//! <output_dir>/<hash>.<permutation>.sdb    (debug database, several permutations)
//! <output_dir>/<debug_dir>/<hash>.glsl     (debug sources, when the source text is known)
//! <output_dir>/<debug_dir>/<hash>.hlsl
//! <output_dir>/<debug_dir>/<hash>.pssl
//! ```
//!
//! A failing entry is logged and recorded in the [`ExportReport`]; only
//! storage errors abort the pass.

use std::collections::HashSet;

use shaderport_core::{ShaderCache, ShaderCacheEntry, ShaderLanguage};
use shaderport_vfs::{VfsProvider, path};

use crate::backend::Backend;
use crate::config::{ExportSettings, PrunePolicy};
use crate::error::{CompileError, ExportError};
use crate::pipeline::{CompiledEntry, ShaderPipeline, Translation};
use crate::transpile::{NagaTranspiler, Transpiler};

/// Outcome of one export pass.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Hashes compiled and written in this pass.
    pub compiled: Vec<String>,
    /// Hashes skipped because their container already existed.
    pub up_to_date: Vec<String>,
    pub failed: Vec<(String, CompileError)>,
    /// Files deleted by pruning.
    pub removed: Vec<String>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives the export of every cache entry into a storage provider.
pub struct ShaderExporter {
    storage: Box<dyn VfsProvider>,
    settings: ExportSettings,
    backend: Backend,
    transpiler: Box<dyn Transpiler>,
}

impl ShaderExporter {
    pub fn new(storage: Box<dyn VfsProvider>, settings: ExportSettings, backend: Backend) -> Self {
        Self {
            storage,
            settings,
            backend,
            transpiler: Box::new(NagaTranspiler::new()),
        }
    }

    /// Replace the SPIR-V decompiler.
    pub fn with_transpiler(mut self, transpiler: Box<dyn Transpiler>) -> Self {
        self.transpiler = transpiler;
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Compile every entry of `cache` and prune stale outputs.
    pub fn export_shaders(&self, cache: &ShaderCache) -> Result<ExportReport, ExportError> {
        shaderport_core::profile_function!();
        if self.storage.is_read_only() {
            return Err(ExportError::Storage(shaderport_vfs::VfsError::ReadOnly));
        }

        let output = self.settings.output_path()?;
        let debug = self.settings.debug_path()?;
        if self.settings.prune == PrunePolicy::ClearAll && self.storage.is_dir(&output)? {
            log::info!("Clearing {output}");
            self.storage.remove_dir(&output)?;
        }
        self.storage.create_dir(&output)?;
        self.storage.create_dir(&debug)?;

        let pipeline = ShaderPipeline::new(self.transpiler.as_ref(), &self.backend, &self.settings);
        let snapshot = cache.snapshot();
        let mut report = ExportReport::default();
        let mut processed: HashSet<String> = HashSet::with_capacity(snapshot.len());

        log::info!(
            "Exporting {} shader(s) to '{output}' with the {}",
            snapshot.len(),
            self.backend.name()
        );

        for (hash, entry) in snapshot.iter() {
            processed.insert(hash.to_owned());

            let container_path = path::join(&output, &self.container_file(hash))?;
            if self.settings.skip_up_to_date && self.storage.exists(&container_path)? {
                log::debug!("{hash} is up to date");
                report.up_to_date.push(hash.to_owned());
                continue;
            }

            log::info!("Compiling {hash}");
            match self.export_entry(&pipeline, hash, entry, &debug)? {
                Ok(compiled) => {
                    self.write_outputs(&output, hash, &container_path, &compiled)?;
                    report.compiled.push(hash.to_owned());
                }
                Err(err) => {
                    log::warn!("Failed to compile {hash} ({}): {err}", entry.stage);
                    report.failed.push((hash.to_owned(), err));
                }
            }
        }

        report.removed = self.prune(&output, &processed)?;

        log::info!(
            "Shader export finished: {} compiled, {} up to date, {} failed, {} removed",
            report.compiled.len(),
            report.up_to_date.len(),
            report.failed.len(),
            report.removed.len()
        );
        Ok(report)
    }

    /// Translate and compile one entry.
    ///
    /// The outer result carries storage errors, the inner one compile errors.
    /// Debug sources are written before the vendor compiler runs so a failing
    /// entry still leaves its HLSL and PSSL behind.
    fn export_entry(
        &self,
        pipeline: &ShaderPipeline<'_>,
        hash: &str,
        entry: &ShaderCacheEntry,
        debug: &str,
    ) -> Result<Result<CompiledEntry, CompileError>, ExportError> {
        shaderport_core::profile_scope_dynamic!(hash);
        let translation = match pipeline.translate(entry) {
            Ok(translation) => translation,
            Err(err) => return Ok(Err(err)),
        };
        if self.settings.write_debug_sources {
            self.write_debug_sources(debug, hash, entry, &translation)?;
        }
        Ok(pipeline.compile(entry, &translation))
    }

    fn write_debug_sources(
        &self,
        debug: &str,
        hash: &str,
        entry: &ShaderCacheEntry,
        translation: &Translation,
    ) -> Result<(), ExportError> {
        if !entry.source_code.is_empty() {
            // HLSL sources would collide with the decompiled HLSL
            let name = match entry.language {
                ShaderLanguage::Hlsl => format!("{hash}.source.hlsl"),
                language => format!("{hash}.{}", language.extension()),
            };
            self.storage
                .write(&path::join(debug, &name)?, entry.source_code.as_bytes())?;
        }
        self.storage
            .write(&path::join(debug, &format!("{hash}.hlsl"))?, translation.hlsl.as_bytes())?;
        self.storage
            .write(&path::join(debug, &format!("{hash}.pssl"))?, translation.pssl.as_bytes())?;
        Ok(())
    }

    fn write_outputs(
        &self,
        output: &str,
        hash: &str,
        container_path: &str,
        compiled: &CompiledEntry,
    ) -> Result<(), ExportError> {
        self.storage.write(container_path, &compiled.container)?;
        log::debug!("Wrote {container_path} ({} bytes)", compiled.container.len());

        if !self.settings.write_debug_database {
            return Ok(());
        }
        let single = compiled.debug_databases.len() == 1;
        for database in &compiled.debug_databases {
            let name = if single {
                format!("{hash}{}", database.extension)
            } else {
                format!("{hash}.{:08x}{}", database.permutation, database.extension)
            };
            self.storage.write(&path::join(output, &name)?, &database.data)?;
        }
        Ok(())
    }

    fn container_file(&self, hash: &str) -> String {
        format!("{hash}.{}", self.settings.container_extension)
    }

    /// Delete every file under `output` whose stem is not a processed hash.
    fn prune(&self, output: &str, processed: &HashSet<String>) -> Result<Vec<String>, ExportError> {
        shaderport_core::profile_scope!("prune");
        let mut removed = Vec::new();
        for file in self.storage.list_files_recursive(output)? {
            if processed.contains(path::stem(&file)) {
                continue;
            }
            log::info!("Removing stale {file}");
            self.storage.delete(&file)?;
            removed.push(file);
        }
        Ok(removed)
    }
}
