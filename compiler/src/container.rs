//! Compiled shader container format.
//!
//! One container per cache entry, little-endian throughout:
//!
//! ```text
//! ContainerHeader                      20 bytes
//! ProgramHeader * num_program_headers  12 bytes each
//! metadata blob                        metadata_size bytes at metadata_offset
//! program bytecode                     back to back, located by ProgramHeader::offset
//! ```
//!
//! The metadata blob is the push-constant value followed by length-prefixed
//! arrays: constant buffers, resources, rw resources and samplers (`u32`
//! entries), the semantic map (`u32`) and the semantic indices (`u8`).
//! Program offsets are absolute, so a reader can hand a program slice
//! straight to the driver.

use std::fmt;

use bytemuck::{Pod, Zeroable};

use crate::mapping::BindingMap;

/// Leading bytes of every container.
pub const CONTAINER_MAGIC: [u8; 4] = *b"SPSH";

pub const CONTAINER_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ContainerHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub metadata_size: u32,
    pub metadata_offset: u32,
    pub num_program_headers: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ProgramHeader {
    pub size: u32,
    /// Output-format permutation id, 0 when the shader has none.
    pub permutation: u32,
    /// Absolute byte offset of the program in the container.
    pub offset: u32,
}

/// Failure while loading a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The data ends before a header, table or section it announces.
    Truncated { needed: usize, available: usize },
    BadMagic([u8; 4]),
    UnsupportedVersion(u32),
    /// Sections overlap, leave gaps or run past the end.
    Layout(String),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "container truncated: need {needed} bytes, have {available}")
            }
            Self::BadMagic(magic) => write!(f, "bad container magic {magic:?}"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported container version {v}"),
            Self::Layout(msg) => write!(f, "invalid container layout: {msg}"),
        }
    }
}

impl std::error::Error for ContainerError {}

/// Decoded metadata blob.
pub type Metadata = BindingMap;

/// Encode the metadata blob.
pub fn encode_metadata(map: &BindingMap) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&map.push_constant.to_le_bytes());
    for table in [
        &map.constant_buffers,
        &map.resources,
        &map.rw_resources,
        &map.samplers,
        &map.semantic_map,
    ] {
        push_u32s(&mut out, table);
    }
    out.extend_from_slice(&(map.semantic_indices.len() as u32).to_le_bytes());
    out.extend_from_slice(&map.semantic_indices);
    out
}

fn push_u32s(out: &mut Vec<u8>, values: &[u32]) {
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decode a metadata blob written by [`encode_metadata`].
pub fn decode_metadata(bytes: &[u8]) -> Result<Metadata, ContainerError> {
    let mut reader = Reader { bytes, pos: 0 };
    let push_constant = reader.u32()?;
    let constant_buffers = reader.u32_array()?;
    let resources = reader.u32_array()?;
    let rw_resources = reader.u32_array()?;
    let samplers = reader.u32_array()?;
    let semantic_map = reader.u32_array()?;
    let count = reader.u32()? as usize;
    let semantic_indices = reader.take(count)?.to_vec();
    if reader.pos != bytes.len() {
        return Err(ContainerError::Layout(format!(
            "{} trailing metadata bytes",
            bytes.len() - reader.pos
        )));
    }
    Ok(BindingMap {
        push_constant,
        constant_buffers,
        resources,
        rw_resources,
        samplers,
        semantic_map,
        semantic_indices,
    })
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ContainerError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.bytes.len()).ok_or(
            ContainerError::Truncated {
                needed: self.pos.saturating_add(len),
                available: self.bytes.len(),
            },
        )?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, ContainerError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u32_array(&mut self) -> Result<Vec<u32>, ContainerError> {
        let count = self.u32()? as usize;
        let bytes = self.take(count.saturating_mul(4))?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

/// One program of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerProgram {
    pub permutation: u32,
    pub bytecode: Vec<u8>,
}

/// A container in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShaderContainer {
    pub metadata: Vec<u8>,
    pub programs: Vec<ContainerProgram>,
}

impl CompiledShaderContainer {
    pub fn new(metadata: &BindingMap, programs: Vec<ContainerProgram>) -> Self {
        Self {
            metadata: encode_metadata(metadata),
            programs,
        }
    }

    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header_size = size_of::<ContainerHeader>();
        let table_size = size_of::<ProgramHeader>() * self.programs.len();
        let metadata_offset = header_size + table_size;

        let header = ContainerHeader {
            magic: CONTAINER_MAGIC,
            version: CONTAINER_VERSION,
            metadata_size: self.metadata.len() as u32,
            metadata_offset: metadata_offset as u32,
            num_program_headers: self.programs.len() as u32,
        };

        let mut offset = metadata_offset + self.metadata.len();
        let table: Vec<ProgramHeader> = self
            .programs
            .iter()
            .map(|p| {
                let entry = ProgramHeader {
                    size: p.bytecode.len() as u32,
                    permutation: p.permutation,
                    offset: offset as u32,
                };
                offset += p.bytecode.len();
                entry
            })
            .collect();

        let mut out = Vec::with_capacity(offset);
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(bytemuck::cast_slice(&table));
        out.extend_from_slice(&self.metadata);
        for program in &self.programs {
            out.extend_from_slice(&program.bytecode);
        }
        out
    }

    /// Parse and validate a container.
    ///
    /// Sections must follow each other with no gap or overlap and end exactly
    /// at the end of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let header_size = size_of::<ContainerHeader>();
        let header: ContainerHeader = read_pod(bytes, 0)?;
        if header.magic != CONTAINER_MAGIC {
            return Err(ContainerError::BadMagic(header.magic));
        }
        if header.version != CONTAINER_VERSION {
            return Err(ContainerError::UnsupportedVersion(header.version));
        }

        let count = header.num_program_headers as usize;
        let mut table = Vec::with_capacity(count.min(64));
        for i in 0..count {
            table.push(read_pod::<ProgramHeader>(
                bytes,
                header_size + i * size_of::<ProgramHeader>(),
            )?);
        }

        let metadata_offset = header_size + count * size_of::<ProgramHeader>();
        if header.metadata_offset as usize != metadata_offset {
            return Err(ContainerError::Layout(format!(
                "metadata at {} instead of {metadata_offset}",
                header.metadata_offset
            )));
        }
        let metadata = slice(bytes, metadata_offset, header.metadata_size as usize)?.to_vec();

        let mut expected = metadata_offset + metadata.len();
        let mut programs = Vec::with_capacity(table.len());
        for entry in &table {
            if entry.offset as usize != expected {
                return Err(ContainerError::Layout(format!(
                    "program {:#x} at {} instead of {expected}",
                    entry.permutation, entry.offset
                )));
            }
            let bytecode = slice(bytes, expected, entry.size as usize)?.to_vec();
            expected += bytecode.len();
            programs.push(ContainerProgram {
                permutation: entry.permutation,
                bytecode,
            });
        }
        if expected != bytes.len() {
            return Err(ContainerError::Layout(format!(
                "{} trailing bytes",
                bytes.len() - expected
            )));
        }

        Ok(Self { metadata, programs })
    }

    /// Decode the metadata blob.
    pub fn decode_metadata(&self) -> Result<Metadata, ContainerError> {
        decode_metadata(&self.metadata)
    }

    /// The program compiled for `permutation`.
    pub fn program(&self, permutation: u32) -> Option<&[u8]> {
        self.programs
            .iter()
            .find(|p| p.permutation == permutation)
            .map(|p| p.bytecode.as_slice())
    }
}

fn slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], ContainerError> {
    let end = offset.saturating_add(len);
    bytes.get(offset..end).ok_or(ContainerError::Truncated {
        needed: end,
        available: bytes.len(),
    })
}

fn read_pod<T: Pod>(bytes: &[u8], offset: usize) -> Result<T, ContainerError> {
    Ok(bytemuck::pod_read_unaligned(slice(bytes, offset, size_of::<T>())?))
}
