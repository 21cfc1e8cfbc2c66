//! IR-to-vendor binding reconciliation.
//!
//! The IR addresses resources by `(set, binding, element)`; the vendor
//! compiler assigns its own bind points per resource category. The mapper
//! matches the two by name and produces, per category, a table indexed by
//! vendor bind point whose entries pack the IR address:
//!
//! ```text
//! bits 28..32  descriptor set
//! bits 24..28  uniform type
//! bits 20..24  binding
//! bits  0..20  array element
//! ```
//!
//! Name transforms applied while matching:
//!
//! | IR descriptor | vendor name | vendor lists |
//! |---------------|-------------|--------------|
//! | uniform buffer | block type name | constant buffers |
//! | storage / texel buffer | variable name | resources, rw resources |
//! | sampled / storage image | `name`, or `name[i]` per element of an array | resources, rw resources |
//! | combined image sampler | `_name_sampler` and `name` | samplers, then resources / rw resources |
//! | sampler | `name`, or `name[i]` | samplers |
//!
//! The names are the ones the decompiled source declares, which need not be
//! the IR's own: naga renames identifiers that end in a digit or clash with a
//! keyword. [`SourceNames`] recovers them from the `register(...)` clause of
//! each declaration, which still carries the IR set and binding.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CompileError;
use crate::reflect::{DescriptorBinding, DescriptorType, IrReflection};
use crate::vendor::{InternalBufferType, Program};

/// Engine-side uniform type stored in bits 24..28 of a mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum UniformType {
    Sampler = 0,
    SamplerWithTexture = 1,
    Texture = 2,
    Image = 3,
    TextureBuffer = 4,
    SamplerWithTextureBuffer = 5,
    ImageBuffer = 6,
    UniformBuffer = 7,
    StorageBuffer = 8,
    InputAttachment = 9,
}

impl UniformType {
    /// Uniform type of an IR descriptor kind, if the engine can bind it.
    pub fn from_descriptor(descriptor_type: DescriptorType) -> Option<Self> {
        match descriptor_type {
            DescriptorType::Sampler => Some(Self::Sampler),
            DescriptorType::CombinedImageSampler => Some(Self::SamplerWithTexture),
            DescriptorType::SampledImage => Some(Self::Texture),
            DescriptorType::StorageImage => Some(Self::Image),
            DescriptorType::UniformTexelBuffer => Some(Self::TextureBuffer),
            DescriptorType::StorageTexelBuffer => Some(Self::ImageBuffer),
            DescriptorType::UniformBuffer => Some(Self::UniformBuffer),
            DescriptorType::StorageBuffer => Some(Self::StorageBuffer),
            DescriptorType::InputAttachment => Some(Self::InputAttachment),
            DescriptorType::AccelerationStructure => None,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            0 => Self::Sampler,
            1 => Self::SamplerWithTexture,
            2 => Self::Texture,
            3 => Self::Image,
            4 => Self::TextureBuffer,
            5 => Self::SamplerWithTextureBuffer,
            6 => Self::ImageBuffer,
            7 => Self::UniformBuffer,
            8 => Self::StorageBuffer,
            9 => Self::InputAttachment,
            _ => return None,
        })
    }
}

/// Constant-buffer slot value marking the push-constant block.
pub const PUSH_CONSTANT_SLOT: u32 = 0;

/// Push-constant value when the program has none.
pub const NO_PUSH_CONSTANT: u32 = u32::MAX;

/// Unused entry of a semantic table.
pub const NO_SEMANTIC: u8 = 0xFF;

const MAX_SET: u32 = 0xF;
const MAX_BINDING: u32 = 0xF;
const MAX_ELEMENT: u32 = 0xF_FFFF;
const MAX_PUSH_CONSTANT_SIZE: u32 = 0x0FFF_FFFF;

/// An IR address packed into one mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub set: u32,
    pub uniform_type: UniformType,
    pub binding: u32,
    pub element: u32,
}

impl BindingSlot {
    pub fn pack(&self) -> Result<u32, CompileError> {
        if self.set > MAX_SET || self.binding > MAX_BINDING || self.element > MAX_ELEMENT {
            return Err(CompileError::BindingOutOfRange(format!(
                "set {} binding {} element {} does not fit a mapping entry",
                self.set, self.binding, self.element
            )));
        }
        Ok((self.set << 28) | ((self.uniform_type as u32) << 24) | (self.binding << 20) | self.element)
    }

    pub fn unpack(value: u32) -> Option<Self> {
        Some(Self {
            set: value >> 28,
            uniform_type: UniformType::from_bits((value >> 24) & 0xF)?,
            binding: (value >> 20) & 0xF,
            element: value & MAX_ELEMENT,
        })
    }
}

/// Vendor resource lists of one program, classified by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorResources {
    pub constant_buffers: Vec<VendorResource>,
    pub resources: Vec<VendorResource>,
    pub rw_resources: Vec<VendorResource>,
    pub samplers: Vec<VendorResource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorResource {
    pub name: String,
    pub bind_point: u32,
    pub size: u32,
}

impl VendorResources {
    /// Sort a program's buffers and samplers into the four categories.
    pub fn classify(program: &Program) -> Result<Self, CompileError> {
        let mut lists = Self::default();
        for buffer in &program.buffers {
            let resource = VendorResource {
                name: buffer.name.clone(),
                bind_point: buffer.bind_point,
                size: buffer.stride,
            };
            match buffer.internal_type {
                InternalBufferType::Cbuffer => lists.constant_buffers.push(resource),
                InternalBufferType::Srv | InternalBufferType::TextureSampler => {
                    lists.resources.push(resource)
                }
                InternalBufferType::Uav => lists.rw_resources.push(resource),
                other => {
                    return Err(CompileError::UnsupportedResourceType(format!(
                        "{} ({})",
                        other.name(),
                        buffer.name
                    )));
                }
            }
        }
        lists.samplers = program
            .sampler_states
            .iter()
            .map(|s| VendorResource {
                name: s.name.clone(),
                bind_point: s.bind_point,
                size: 0,
            })
            .collect();
        Ok(lists)
    }
}

/// Binding tables and vertex semantic tables of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMap {
    /// `bind_point << 28 | size`, or [`NO_PUSH_CONSTANT`].
    pub push_constant: u32,
    pub constant_buffers: Vec<u32>,
    pub resources: Vec<u32>,
    pub rw_resources: Vec<u32>,
    pub samplers: Vec<u32>,
    /// `semantic_map[attribute] = vendor resource index`.
    pub semantic_map: Vec<u32>,
    /// `semantic_indices[TEXCOORD index] = attribute`.
    pub semantic_indices: Vec<u8>,
}

impl Default for BindingMap {
    fn default() -> Self {
        Self {
            push_constant: NO_PUSH_CONSTANT,
            constant_buffers: Vec::new(),
            resources: Vec::new(),
            rw_resources: Vec::new(),
            samplers: Vec::new(),
            semantic_map: Vec::new(),
            semantic_indices: Vec::new(),
        }
    }
}

impl BindingMap {
    /// Bind point and byte size of the push-constant block.
    pub fn push_constant(&self) -> Option<(u32, u32)> {
        (self.push_constant != NO_PUSH_CONSTANT)
            .then(|| (self.push_constant >> 28, self.push_constant & MAX_PUSH_CONSTANT_SIZE))
    }
}

static REGISTER_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\w+)\s*(?:\[\s*\d+\s*\])?\s*:\s*register\(\s*([bstu])(\d+)\s*(?:,\s*space(\d+)\s*)?\)")
        .expect("invalid register declaration pattern")
});

static PUSH_CONSTANT_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bConstantBuffer\s*<\s*\w+\s*>\s*(\w+)\s*:\s*register\(")
        .expect("invalid push constant pattern")
});

/// Resource names as declared in decompiled HLSL.
///
/// Keyed by register class (`b`, `s`, `t` or `u`), space and register, which
/// the decompiler takes from the IR descriptor set and binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceNames {
    registers: HashMap<(char, u32, u32), String>,
    push_constant: Option<String>,
}

impl SourceNames {
    pub fn parse(hlsl: &str) -> Self {
        let push_constant = PUSH_CONSTANT_DECLARATION
            .captures(hlsl)
            .map(|caps| caps[1].to_owned());
        let mut registers = HashMap::new();
        for caps in REGISTER_DECLARATION.captures_iter(hlsl) {
            let name = &caps[1];
            if push_constant.as_deref() == Some(name) {
                continue;
            }
            let class = caps[2].chars().next().unwrap_or('t');
            let (Ok(register), Ok(space)) = (
                caps[3].parse::<u32>(),
                caps.get(4).map_or(Ok(0), |m| m.as_str().parse::<u32>()),
            ) else {
                continue;
            };
            registers.insert((class, space, register), name.to_owned());
        }
        Self {
            registers,
            push_constant,
        }
    }

    /// Name declared at `set`/`binding` in one of `classes`, if any.
    pub fn resource(&self, classes: &str, set: u32, binding: u32) -> Option<&str> {
        classes
            .chars()
            .find_map(|class| self.registers.get(&(class, set, binding)))
            .map(String::as_str)
    }

    pub fn push_constant(&self) -> Option<&str> {
        self.push_constant.as_deref()
    }
}

/// Mapping table under construction: one optional entry per bind point.
struct Table<'a> {
    category: &'static str,
    list: &'a [VendorResource],
    slots: Vec<Option<u32>>,
}

impl<'a> Table<'a> {
    fn new(category: &'static str, list: &'a [VendorResource]) -> Self {
        let len = list.iter().map(|r| r.bind_point as usize + 1).max().unwrap_or(0);
        Self {
            category,
            list,
            slots: vec![None; len],
        }
    }

    fn find(&self, name: &str) -> Option<&'a VendorResource> {
        self.list.iter().find(|r| r.name == name)
    }

    fn set(&mut self, bind_point: u32, value: u32) {
        self.slots[bind_point as usize] = Some(value);
    }

    /// Map `name` if this list has it. Returns whether it matched.
    fn map(&mut self, name: &str, slot: BindingSlot) -> Result<bool, CompileError> {
        match self.find(name) {
            Some(resource) => {
                self.set(resource.bind_point, slot.pack()?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Every slot must be filled and every bind point accounted for.
    fn finish(self) -> Result<Vec<u32>, CompileError> {
        if self.slots.len() != self.list.len() {
            return Err(CompileError::BindingOutOfRange(format!(
                "{} bind points are not contiguous: {} entries for {} resources",
                self.category,
                self.slots.len(),
                self.list.len()
            )));
        }
        self.slots
            .into_iter()
            .enumerate()
            .map(|(bind_point, slot)| {
                slot.ok_or_else(|| CompileError::UnmappedVendorResource {
                    category: self.category,
                    name: self
                        .list
                        .iter()
                        .find(|r| r.bind_point as usize == bind_point)
                        .map(|r| r.name.clone())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// Match a read-only-or-read-write resource against both lists.
fn map_either(
    name: &str,
    slot: BindingSlot,
    resources: &mut Table<'_>,
    rw_resources: &mut Table<'_>,
) -> Result<(), CompileError> {
    if resources.find(name).is_some() && rw_resources.find(name).is_some() {
        return Err(CompileError::AmbiguousResource(name.to_owned()));
    }
    if !resources.map(name, slot)? && !rw_resources.map(name, slot)? {
        log::trace!("'{name}' was eliminated by the vendor compiler");
    }
    Ok(())
}

fn element_name(name: &str, binding: &DescriptorBinding, element: u32) -> String {
    if binding.count > 1 {
        format!("{name}[{element}]")
    } else {
        name.to_owned()
    }
}

/// Build the binding tables reconciling `ir` with the vendor `program`.
///
/// `names` gives the identifiers the vendor compiler saw; IR names are used
/// for resources it has no declaration for.
pub fn map_bindings(
    ir: &IrReflection,
    program: &Program,
    names: &SourceNames,
) -> Result<BindingMap, CompileError> {
    let vendor = VendorResources::classify(program)?;
    let mut constant_buffers = Table::new("constant buffer", &vendor.constant_buffers);
    let mut resources = Table::new("resource", &vendor.resources);
    let mut rw_resources = Table::new("rw resource", &vendor.rw_resources);
    let mut samplers = Table::new("sampler", &vendor.samplers);

    for binding in &ir.bindings {
        let uniform_type = UniformType::from_descriptor(binding.descriptor_type)
            .ok_or_else(|| CompileError::UnsupportedDescriptorKind(binding.descriptor_type.name().into()))?;
        let slot = |element| BindingSlot {
            set: binding.set,
            uniform_type,
            binding: binding.binding,
            element,
        };
        let declared = |classes: &'static str| {
            names
                .resource(classes, binding.set, binding.binding)
                .unwrap_or(&binding.name)
        };

        match binding.descriptor_type {
            DescriptorType::UniformBuffer => {
                single(binding)?;
                let name = names
                    .resource("b", binding.set, binding.binding)
                    .unwrap_or(&binding.type_name);
                constant_buffers.map(name, slot(0))?;
            }
            DescriptorType::StorageBuffer
            | DescriptorType::UniformTexelBuffer
            | DescriptorType::StorageTexelBuffer => {
                single(binding)?;
                map_either(declared("tu"), slot(0), &mut resources, &mut rw_resources)?;
            }
            DescriptorType::SampledImage | DescriptorType::StorageImage => {
                let declared = declared("tu");
                for element in 0..binding.count {
                    let name = element_name(declared, binding, element);
                    map_either(&name, slot(element), &mut resources, &mut rw_resources)?;
                }
            }
            DescriptorType::CombinedImageSampler => {
                single(binding)?;
                let sampler = names
                    .resource("s", binding.set, binding.binding)
                    .map_or_else(|| format!("_{}_sampler", binding.name), str::to_owned);
                samplers.map(&sampler, slot(0))?;
                map_either(declared("t"), slot(0), &mut resources, &mut rw_resources)?;
            }
            DescriptorType::Sampler => {
                let declared = declared("s");
                for element in 0..binding.count {
                    samplers.map(&element_name(declared, binding, element), slot(element))?;
                }
            }
            DescriptorType::InputAttachment | DescriptorType::AccelerationStructure => {
                return Err(CompileError::UnsupportedDescriptorKind(format!(
                    "{} '{}'",
                    binding.descriptor_type.name(),
                    binding.name
                )));
            }
        }
    }

    let mut push_constant = NO_PUSH_CONSTANT;
    if let Some(block) = &ir.push_constant {
        let name = names.push_constant().unwrap_or(&block.name);
        if let Some(resource) = constant_buffers.find(name) {
            if resource.size != block.size {
                return Err(CompileError::PushConstantSizeMismatch {
                    name: block.name.clone(),
                    ir: block.size,
                    vendor: resource.size,
                });
            }
            if resource.bind_point > MAX_SET || resource.size > MAX_PUSH_CONSTANT_SIZE {
                return Err(CompileError::BindingOutOfRange(format!(
                    "push constant '{}' at bind point {}",
                    block.name, resource.bind_point
                )));
            }
            push_constant = (resource.bind_point << 28) | resource.size;
            constant_buffers.set(resource.bind_point, PUSH_CONSTANT_SLOT);
        }
    }

    let (semantic_map, semantic_indices) = semantic_tables(program)?;

    Ok(BindingMap {
        push_constant,
        constant_buffers: constant_buffers.finish()?,
        resources: resources.finish()?,
        rw_resources: rw_resources.finish()?,
        samplers: samplers.finish()?,
        semantic_map,
        semantic_indices,
    })
}

fn single(binding: &DescriptorBinding) -> Result<(), CompileError> {
    if binding.count != 1 {
        return Err(CompileError::UnsupportedDescriptorKind(format!(
            "array of {} {}s '{}'",
            binding.count,
            binding.descriptor_type.name(),
            binding.name
        )));
    }
    Ok(())
}

/// Vertex input semantic tables.
///
/// Hardware-fed inputs are skipped; every other input must be `TEXCOORD<n>`.
fn semantic_tables(program: &Program) -> Result<(Vec<u32>, Vec<u8>), CompileError> {
    let attributes = &program.input_attributes;
    if attributes.len() > NO_SEMANTIC as usize {
        return Err(CompileError::BindingOutOfRange(format!(
            "{} input attributes",
            attributes.len()
        )));
    }

    let mut semantic_map = vec![u32::MAX; attributes.len()];
    let mut semantic_indices: Vec<u8> = Vec::new();
    for (a, attribute) in attributes.iter().enumerate() {
        if attribute.semantic.is_hardware_fed() {
            continue;
        }
        if attribute.semantic_name != "TEXCOORD" {
            return Err(CompileError::SemanticConvention(format!(
                "{}{}",
                attribute.semantic_name, attribute.semantic_index
            )));
        }
        let index = attribute.semantic_index as usize;
        if index >= semantic_indices.len() {
            semantic_indices.resize(index + 1, NO_SEMANTIC);
        }
        semantic_indices[index] = a as u8;
        semantic_map[a] = attribute.resource_index;
    }
    Ok((semantic_map, semantic_indices))
}
