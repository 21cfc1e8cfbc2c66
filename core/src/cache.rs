//! Content-addressed cache of compiled shader IR.
//!
//! The engine's shader front end records every SPIR-V program it produces here
//! while a project is scanned, and the exporter later walks a [`CacheSnapshot`]
//! of it. Entries are keyed by the lower-case hex MD5 digest of the IR bytes,
//! so two identical programs always collapse into a single entry and are
//! compiled once.
//!
//! The cache is an ordinary value passed to whoever needs it; there is no
//! process-wide instance.
//!
//! # Example
//!
//! ```ignore
//! use shaderport_core::{ShaderCache, ShaderLanguage, ShaderStage};
//!
//! let cache = ShaderCache::new();
//! let hash = cache.insert(ShaderStage::Fragment, ShaderLanguage::Glsl, source, &spirv_bytes)?;
//!
//! for (hash, entry) in cache.snapshot().iter() {
//!     println!("{hash}: {} words", entry.program.len());
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::stage::{ShaderLanguage, ShaderStage};

/// Errors raised while recording programs in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The IR byte length is not a whole number of 32-bit words.
    MisalignedProgram { len: usize },
    /// The engine's source compiler rejected the shader.
    SourceCompileFailed(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MisalignedProgram { len } => {
                write!(f, "IR length {len} is not a multiple of 4 bytes")
            }
            Self::SourceCompileFailed(msg) => write!(f, "source compilation failed: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// One distinct IR program recorded by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCacheEntry {
    /// SPIR-V words.
    pub program: Vec<u32>,
    pub stage: ShaderStage,
    pub language: ShaderLanguage,
    /// Source text the program was compiled from, empty when unknown.
    pub source_code: String,
}

impl ShaderCacheEntry {
    /// Size of the IR in bytes.
    pub fn size_bytes(&self) -> usize {
        self.program.len() * 4
    }

    /// The IR as the byte buffer it was hashed from.
    pub fn program_bytes(&self) -> Vec<u8> {
        self.program.iter().flat_map(|w| w.to_ne_bytes()).collect()
    }
}

/// The engine's source-to-SPIR-V front end.
///
/// Implemented outside this workspace (glslang, shaderc, ...). The cache only
/// needs the produced bytes.
pub trait SourceCompiler {
    fn compile(
        &self,
        stage: ShaderStage,
        source: &str,
        language: ShaderLanguage,
    ) -> Result<Vec<u8>, String>;
}

/// Key of an IR buffer: lower-case hex MD5 of its bytes.
pub fn content_hash(ir: &[u8]) -> String {
    format!("{:x}", md5::compute(ir))
}

/// Thread-safe content-addressed store of IR programs.
#[derive(Default)]
pub struct ShaderCache {
    entries: RwLock<BTreeMap<String, Arc<ShaderCacheEntry>>>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a compiled program and return its key.
    ///
    /// Empty IR records nothing and returns `None`. Inserting IR that is
    /// already cached keeps the first entry.
    pub fn insert(
        &self,
        stage: ShaderStage,
        language: ShaderLanguage,
        source_code: impl Into<String>,
        ir: &[u8],
    ) -> Result<Option<String>, CacheError> {
        if ir.is_empty() {
            return Ok(None);
        }
        if ir.len() % 4 != 0 {
            return Err(CacheError::MisalignedProgram { len: ir.len() });
        }

        let hash = content_hash(ir);
        let mut entries = self.entries.write();
        if !entries.contains_key(&hash) {
            let program = ir
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            log::trace!("Caching {stage} shader {hash} ({} bytes)", ir.len());
            entries.insert(
                hash.clone(),
                Arc::new(ShaderCacheEntry {
                    program,
                    stage,
                    language,
                    source_code: source_code.into(),
                }),
            );
        }
        Ok(Some(hash))
    }

    /// Compile `source` with the engine's front end and cache the result.
    ///
    /// Returns the IR bytes exactly as the front end produced them.
    pub fn compile_from_source(
        &self,
        compiler: &dyn SourceCompiler,
        stage: ShaderStage,
        source: &str,
        language: ShaderLanguage,
    ) -> Result<Vec<u8>, CacheError> {
        let ir = compiler
            .compile(stage, source, language)
            .map_err(CacheError::SourceCompileFailed)?;
        self.insert(stage, language, source, &ir)?;
        Ok(ir)
    }

    pub fn get(&self, hash: &str) -> Option<Arc<ShaderCacheEntry>> {
        self.entries.read().get(hash).cloned()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.read().contains_key(hash)
    }

    pub fn remove(&self, hash: &str) -> Option<Arc<ShaderCacheEntry>> {
        self.entries.write().remove(hash)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Immutable view of the current entries, ordered by key.
    ///
    /// Later insertions or removals do not affect an existing snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        let entries = self
            .entries
            .read()
            .iter()
            .map(|(hash, entry)| (hash.clone(), Arc::clone(entry)))
            .collect();
        CacheSnapshot { entries }
    }
}

/// Stable, hash-ordered list of cache entries.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    entries: Vec<(String, Arc<ShaderCacheEntry>)>,
}

impl CacheSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShaderCacheEntry)> {
        self.entries.iter().map(|(h, e)| (h.as_str(), e.as_ref()))
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
