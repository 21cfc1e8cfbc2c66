//! SPIR-V resource reflection.
//!
//! Enumerates what the binding mapper needs from the IR side: descriptor
//! bindings, the push-constant block and the number of located stage outputs.

use std::collections::HashMap;

use rspirv::dr::{self, Operand};
use rspirv::spirv::{Decoration, Dim, Op, StorageClass, Word};

use crate::error::CompileError;

/// Descriptor kind of an IR binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    InputAttachment,
    AccelerationStructure,
}

impl DescriptorType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sampler => "sampler",
            Self::CombinedImageSampler => "combined image sampler",
            Self::SampledImage => "sampled image",
            Self::StorageImage => "storage image",
            Self::UniformTexelBuffer => "uniform texel buffer",
            Self::StorageTexelBuffer => "storage texel buffer",
            Self::UniformBuffer => "uniform buffer",
            Self::StorageBuffer => "storage buffer",
            Self::InputAttachment => "input attachment",
            Self::AccelerationStructure => "acceleration structure",
        }
    }
}

/// One `(set, binding)` declaration of the IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// Variable name.
    pub name: String,
    /// Name of the pointee type; the block name for buffers.
    pub type_name: String,
    pub descriptor_type: DescriptorType,
    pub set: u32,
    pub binding: u32,
    /// Array element count, 1 for plain bindings.
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConstantBlock {
    /// Variable name.
    pub name: String,
    pub type_name: String,
    /// Byte size, rounded up to 16.
    pub size: u32,
}

/// Resource interface of one SPIR-V program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrReflection {
    pub bindings: Vec<DescriptorBinding>,
    pub push_constant: Option<PushConstantBlock>,
    /// Output variables with a `Location`, i.e. render targets for fragments.
    pub output_count: u32,
}

#[derive(Debug, Clone)]
enum Type {
    Scalar { bytes: u32 },
    Vector { component: Word, count: u32 },
    Matrix { column: Word, columns: u32 },
    Array { element: Word, length: Word },
    RuntimeArray,
    Struct { members: Vec<Word> },
    Image { dim: Dim, sampled: u32 },
    SampledImage,
    Sampler,
    AccelerationStructure,
    Pointer { class: StorageClass, pointee: Word },
    Other,
}

/// Index of the module's types, names and decorations.
struct Module {
    types: HashMap<Word, Type>,
    constants: HashMap<Word, u32>,
    names: HashMap<Word, String>,
    decorations: HashMap<Word, Vec<(Decoration, Option<u32>)>>,
    member_decorations: HashMap<(Word, u32), Vec<(Decoration, Option<u32>)>>,
}

impl Module {
    fn index(module: &dr::Module) -> Self {
        let mut index = Self {
            types: HashMap::new(),
            constants: HashMap::new(),
            names: HashMap::new(),
            decorations: HashMap::new(),
            member_decorations: HashMap::new(),
        };

        for inst in &module.debug_names {
            if inst.class.opcode == Op::Name {
                if let (Some(Operand::IdRef(id)), Some(Operand::LiteralString(name))) =
                    (inst.operands.first(), inst.operands.get(1))
                {
                    index.names.insert(*id, name.clone());
                }
            }
        }

        for inst in &module.annotations {
            match (inst.class.opcode, inst.operands.as_slice()) {
                (Op::Decorate, [Operand::IdRef(id), Operand::Decoration(d), rest @ ..]) => {
                    index
                        .decorations
                        .entry(*id)
                        .or_default()
                        .push((*d, literal(rest.first())));
                }
                (
                    Op::MemberDecorate,
                    [Operand::IdRef(id), Operand::LiteralBit32(member), Operand::Decoration(d), rest @ ..],
                ) => {
                    index
                        .member_decorations
                        .entry((*id, *member))
                        .or_default()
                        .push((*d, literal(rest.first())));
                }
                _ => {}
            }
        }

        for inst in &module.types_global_values {
            let Some(id) = inst.result_id else { continue };
            let ops = inst.operands.as_slice();
            let ty = match (inst.class.opcode, ops) {
                (Op::TypeBool, _) => Type::Scalar { bytes: 4 },
                (Op::TypeInt | Op::TypeFloat, [Operand::LiteralBit32(width), ..]) => {
                    Type::Scalar { bytes: width / 8 }
                }
                (Op::TypeVector, [Operand::IdRef(component), Operand::LiteralBit32(count)]) => {
                    Type::Vector {
                        component: *component,
                        count: *count,
                    }
                }
                (Op::TypeMatrix, [Operand::IdRef(column), Operand::LiteralBit32(columns)]) => {
                    Type::Matrix {
                        column: *column,
                        columns: *columns,
                    }
                }
                (Op::TypeArray, [Operand::IdRef(element), Operand::IdRef(length)]) => Type::Array {
                    element: *element,
                    length: *length,
                },
                (Op::TypeRuntimeArray, _) => Type::RuntimeArray,
                (Op::TypeStruct, _) => Type::Struct {
                    members: ops
                        .iter()
                        .filter_map(|op| match op {
                            Operand::IdRef(id) => Some(*id),
                            _ => None,
                        })
                        .collect(),
                },
                (Op::TypeImage, [_, Operand::Dim(dim), _, _, _, Operand::LiteralBit32(sampled), ..]) => {
                    Type::Image {
                        dim: *dim,
                        sampled: *sampled,
                    }
                }
                (Op::TypeSampledImage, _) => Type::SampledImage,
                (Op::TypeSampler, _) => Type::Sampler,
                (Op::TypeAccelerationStructureKHR, _) => Type::AccelerationStructure,
                (Op::TypePointer, [Operand::StorageClass(class), Operand::IdRef(pointee)]) => {
                    Type::Pointer {
                        class: *class,
                        pointee: *pointee,
                    }
                }
                (Op::Constant, [Operand::LiteralBit32(value), ..]) => {
                    index.constants.insert(id, *value);
                    continue;
                }
                _ => Type::Other,
            };
            index.types.insert(id, ty);
        }

        index
    }

    fn name(&self, id: Word) -> String {
        self.names.get(&id).cloned().unwrap_or_default()
    }

    fn decoration(&self, id: Word, decoration: Decoration) -> Option<Option<u32>> {
        self.decorations
            .get(&id)?
            .iter()
            .find(|(d, _)| *d == decoration)
            .map(|(_, value)| *value)
    }

    fn member_decoration(&self, id: Word, member: u32, decoration: Decoration) -> Option<Option<u32>> {
        self.member_decorations
            .get(&(id, member))?
            .iter()
            .find(|(d, _)| *d == decoration)
            .map(|(_, value)| *value)
    }

    fn array_length(&self, length: Word) -> Result<u32, CompileError> {
        self.constants
            .get(&length)
            .copied()
            .ok_or_else(|| CompileError::Reflection(format!("array length %{length} is not a constant")))
    }

    /// Byte size of `ty` as laid out in a block.
    ///
    /// `matrix` carries the member's `MatrixStride` and whether it is row-major.
    fn size_of(&self, ty: Word, matrix: Option<(u32, bool)>) -> Result<u32, CompileError> {
        match self.types.get(&ty) {
            Some(Type::Scalar { bytes }) => Ok(*bytes),
            Some(Type::Vector { component, count }) => product(self.size_of(*component, None)?, *count),
            Some(Type::Matrix { column, columns }) => {
                let rows = match self.types.get(column) {
                    Some(Type::Vector { count, .. }) => *count,
                    _ => 1,
                };
                match matrix {
                    Some((stride, true)) => product(stride, rows),
                    Some((stride, false)) => product(stride, *columns),
                    None => product(self.size_of(*column, None)?, *columns),
                }
            }
            Some(Type::Array { element, length }) => {
                let length = self.array_length(*length)?;
                let stride = match self.decoration(ty, Decoration::ArrayStride) {
                    Some(Some(stride)) => stride,
                    _ => self.size_of(*element, matrix)?,
                };
                product(stride, length)
            }
            Some(Type::Struct { members }) => {
                let mut end = 0;
                for (i, &member) in members.iter().enumerate() {
                    let i = i as u32;
                    let offset = self
                        .member_decoration(ty, i, Decoration::Offset)
                        .flatten()
                        .unwrap_or(end);
                    let matrix = self
                        .member_decoration(ty, i, Decoration::MatrixStride)
                        .flatten()
                        .map(|stride| {
                            let row_major = self.member_decoration(ty, i, Decoration::RowMajor).is_some();
                            (stride, row_major)
                        });
                    let member_end = offset
                        .checked_add(self.size_of(member, matrix)?)
                        .ok_or_else(|| overflow(ty))?;
                    end = end.max(member_end);
                }
                Ok(end)
            }
            _ => Err(CompileError::Reflection(format!("type %{ty} has no block layout"))),
        }
    }

    /// Descriptor kind and element count of a resource variable's pointee.
    fn descriptor(
        &self,
        class: StorageClass,
        pointee: Word,
    ) -> Result<(DescriptorType, u32, Word), CompileError> {
        let mut ty = pointee;
        let mut count = 1;
        loop {
            match self.types.get(&ty) {
                Some(Type::Array { element, length }) => {
                    count = product(count, self.array_length(*length)?)?;
                    ty = *element;
                }
                Some(Type::RuntimeArray) => {
                    return Err(CompileError::Reflection(
                        "runtime-sized descriptor arrays are not supported".into(),
                    ));
                }
                _ => break,
            }
        }

        let descriptor_type = match self.types.get(&ty) {
            Some(Type::Sampler) => DescriptorType::Sampler,
            Some(Type::SampledImage) => DescriptorType::CombinedImageSampler,
            Some(Type::Image { dim, sampled }) => match (dim, sampled) {
                (Dim::DimBuffer, 2) => DescriptorType::StorageTexelBuffer,
                (Dim::DimBuffer, _) => DescriptorType::UniformTexelBuffer,
                (Dim::DimSubpassData, _) => DescriptorType::InputAttachment,
                (_, 2) => DescriptorType::StorageImage,
                _ => DescriptorType::SampledImage,
            },
            Some(Type::AccelerationStructure) => DescriptorType::AccelerationStructure,
            Some(Type::Struct { .. }) => {
                let buffer_block = self.decoration(ty, Decoration::BufferBlock).is_some();
                match class {
                    StorageClass::StorageBuffer => DescriptorType::StorageBuffer,
                    StorageClass::Uniform if buffer_block => DescriptorType::StorageBuffer,
                    StorageClass::Uniform => DescriptorType::UniformBuffer,
                    other => {
                        return Err(CompileError::UnsupportedDescriptorKind(format!(
                            "block in storage class {other:?}"
                        )));
                    }
                }
            }
            _ => {
                return Err(CompileError::UnsupportedDescriptorKind(format!(
                    "variable of type %{ty}"
                )));
            }
        };
        Ok((descriptor_type, count, ty))
    }
}

fn overflow(ty: Word) -> CompileError {
    CompileError::InvalidProgram(format!("size of type %{ty} overflows 32 bits"))
}

fn product(a: u32, b: u32) -> Result<u32, CompileError> {
    a.checked_mul(b).ok_or_else(|| {
        CompileError::InvalidProgram(format!("{a} * {b} overflows 32 bits"))
    })
}

fn literal(operand: Option<&Operand>) -> Option<u32> {
    match operand? {
        Operand::LiteralBit32(value) => Some(*value),
        _ => None,
    }
}

/// Reflect the resource interface of a SPIR-V program.
pub fn reflect(words: &[u32]) -> Result<IrReflection, CompileError> {
    let module = dr::load_words(words)
        .map_err(|e| CompileError::Reflection(format!("SPIR-V parse error: {e:?}")))?;
    let index = Module::index(&module);

    let mut reflection = IrReflection::default();
    for inst in &module.types_global_values {
        if inst.class.opcode != Op::Variable {
            continue;
        }
        let (Some(id), Some(pointer)) = (inst.result_id, inst.result_type) else {
            continue;
        };
        let Some(Type::Pointer { class, pointee }) = index.types.get(&pointer) else {
            continue;
        };

        match class {
            StorageClass::PushConstant => {
                let size = index.size_of(*pointee, None)?;
                reflection.push_constant = Some(PushConstantBlock {
                    name: index.name(id),
                    type_name: index.name(*pointee),
                    size: product(size.div_ceil(16), 16)?,
                });
            }
            StorageClass::Output => {
                if index.decoration(id, Decoration::Location).is_some() {
                    reflection.output_count += 1;
                }
            }
            StorageClass::UniformConstant | StorageClass::Uniform | StorageClass::StorageBuffer => {
                let (Some(Some(set)), Some(Some(binding))) = (
                    index.decoration(id, Decoration::DescriptorSet),
                    index.decoration(id, Decoration::Binding),
                ) else {
                    continue;
                };
                let (descriptor_type, count, element) = index.descriptor(*class, *pointee)?;
                reflection.bindings.push(DescriptorBinding {
                    name: index.name(id),
                    type_name: index.name(element),
                    descriptor_type,
                    set,
                    binding,
                    count,
                });
            }
            _ => {}
        }
    }

    log::trace!(
        "Reflected {} binding(s), push constant: {}",
        reflection.bindings.len(),
        reflection.push_constant.is_some()
    );
    Ok(reflection)
}
