//! Combined image-sampler splitting.
//!
//! naga's SPIR-V front end does not accept `OpTypeSampledImage` variables, so
//! each `UniformConstant` variable of that type is rewritten into a plain image
//! variable plus a companion sampler variable named `_<name>_sampler`. Every
//! load of the original variable is replaced by two loads and an
//! `OpSampledImage` producing the same result id, so the rest of the function
//! body is left untouched.
//!
//! The image keeps the combined descriptor set and binding. The sampler gets
//! the next free binding of the same set, since naga rejects two resources at
//! one binding; [`SplitSampler`] records both so the decompiled register can be
//! moved back to the combined slot.
//!
//! Arrays of combined image-samplers are left as they are.

use std::collections::HashMap;

use rspirv::binary::Assemble;
use rspirv::dr::{self, Instruction, Operand};
use rspirv::spirv::{Decoration, Op, StorageClass, Word};

use crate::error::CompileError;

/// A sampler split off a combined image-sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSampler {
    pub name: String,
    pub set: u32,
    /// Binding the sampler was given in the split module.
    pub binding: u32,
    /// Binding of the combined image-sampler it came from.
    pub combined_binding: u32,
}

/// A module after splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitModule {
    pub words: Vec<u32>,
    pub samplers: Vec<SplitSampler>,
}

impl SplitModule {
    fn unchanged(words: &[u32]) -> Self {
        Self {
            words: words.to_vec(),
            samplers: Vec::new(),
        }
    }
}

/// A combined image-sampler variable and the types it splits into.
struct CombinedVariable {
    var: Word,
    image_type: Word,
    image_ptr: Word,
    sampler_var: Word,
}

/// Check whether a module declares any combined image-sampler type.
///
/// Scans the raw words so modules without one skip the full parse.
pub fn has_combined_samplers(words: &[u32]) -> bool {
    let mut i = 5;
    while i < words.len() {
        let word = words[i];
        let count = (word >> 16) as usize;
        if word & 0xffff == Op::TypeSampledImage as u32 {
            return true;
        }
        if count == 0 {
            return false;
        }
        i += count;
    }
    false
}

/// Split every combined image-sampler variable into an image and a sampler.
///
/// Modules without combined image-samplers are returned unchanged.
pub fn split_combined_samplers(words: &[u32]) -> Result<SplitModule, CompileError> {
    let mut module = dr::load_words(words)
        .map_err(|e| CompileError::TranspileFailed(format!("SPIR-V parse error: {e:?}")))?;

    let sampled_images: HashMap<Word, Word> = module
        .types_global_values
        .iter()
        .filter(|inst| inst.class.opcode == Op::TypeSampledImage)
        .filter_map(|inst| Some((inst.result_id?, id_operand(inst, 0)?)))
        .collect();
    if sampled_images.is_empty() {
        return Ok(SplitModule::unchanged(words));
    }

    let pointers: HashMap<Word, (StorageClass, Word)> = module
        .types_global_values
        .iter()
        .filter(|inst| inst.class.opcode == Op::TypePointer)
        .filter_map(|inst| {
            let class = match inst.operands.first()? {
                Operand::StorageClass(class) => *class,
                _ => return None,
            };
            Some((inst.result_id?, (class, id_operand(inst, 1)?)))
        })
        .collect();

    // (variable, image type) for every combined variable, in declaration order
    let targets: Vec<(Word, Word)> = module
        .types_global_values
        .iter()
        .filter(|inst| inst.class.opcode == Op::Variable)
        .filter_map(|inst| {
            let (class, pointee) = pointers.get(&inst.result_type?)?;
            if *class != StorageClass::UniformConstant {
                return None;
            }
            Some((inst.result_id?, *sampled_images.get(pointee)?))
        })
        .collect();
    if targets.is_empty() {
        return Ok(SplitModule::unchanged(words));
    }

    let mut bound = module
        .header
        .as_ref()
        .ok_or_else(|| CompileError::TranspileFailed("SPIR-V module has no header".into()))?
        .bound;
    let mut next_id = move || {
        let id = bound;
        bound += 1;
        id
    };

    let mut new_types = Vec::new();
    let sampler_type = match module
        .types_global_values
        .iter()
        .find(|inst| inst.class.opcode == Op::TypeSampler)
        .and_then(|inst| inst.result_id)
    {
        Some(id) => id,
        None => {
            let id = next_id();
            new_types.push(Instruction::new(Op::TypeSampler, None, Some(id), vec![]));
            id
        }
    };

    let mut uniform_pointers: HashMap<Word, Word> = pointers
        .iter()
        .filter(|&(_, &(class, _))| class == StorageClass::UniformConstant)
        .map(|(&id, &(_, pointee))| (pointee, id))
        .collect();
    let mut uniform_pointer = |pointee: Word, new_types: &mut Vec<Instruction>, id: Word| {
        if let Some(&existing) = uniform_pointers.get(&pointee) {
            return existing;
        }
        new_types.push(Instruction::new(
            Op::TypePointer,
            None,
            Some(id),
            vec![
                Operand::StorageClass(StorageClass::UniformConstant),
                Operand::IdRef(pointee),
            ],
        ));
        uniform_pointers.insert(pointee, id);
        id
    };

    let candidate = next_id();
    let sampler_ptr = uniform_pointer(sampler_type, &mut new_types, candidate);
    let mut combined = Vec::with_capacity(targets.len());
    for &(var, image_type) in &targets {
        let candidate = next_id();
        let image_ptr = uniform_pointer(image_type, &mut new_types, candidate);
        combined.push(CombinedVariable {
            var,
            image_type,
            image_ptr,
            sampler_var: next_id(),
        });
    }

    let bindings = resource_bindings(&module);
    let mut next_free: HashMap<u32, u32> = HashMap::new();
    for &(set, binding) in bindings.values() {
        let free = next_free.entry(set).or_insert(0);
        *free = (*free).max(binding + 1);
    }

    // Combined variables move behind every existing declaration, right after
    // the types they now point to, each followed by its sampler.
    let (mut moved, kept): (Vec<Instruction>, Vec<Instruction>) = module
        .types_global_values
        .drain(..)
        .partition(|inst| combined.iter().any(|c| inst.result_id == Some(c.var)));
    module.types_global_values = kept;
    module.types_global_values.extend(new_types);

    let mut samplers = Vec::with_capacity(combined.len());
    for entry in &combined {
        let Some(index) = moved.iter().position(|inst| inst.result_id == Some(entry.var)) else {
            continue;
        };
        let mut variable = moved.swap_remove(index);
        variable.result_type = Some(entry.image_ptr);
        module.types_global_values.push(variable);
        module.types_global_values.push(Instruction::new(
            Op::Variable,
            Some(sampler_ptr),
            Some(entry.sampler_var),
            vec![Operand::StorageClass(StorageClass::UniformConstant)],
        ));

        let name = format!("_{}_sampler", variable_name(&module, entry.var));
        module.debug_names.push(Instruction::new(
            Op::Name,
            None,
            None,
            vec![Operand::IdRef(entry.sampler_var), Operand::LiteralString(name.clone())],
        ));

        if let Some(&(set, combined_binding)) = bindings.get(&entry.var) {
            let free = next_free.entry(set).or_insert(0);
            let binding = *free;
            *free += 1;
            module.annotations.push(decorate(entry.sampler_var, Decoration::DescriptorSet, set));
            module.annotations.push(decorate(entry.sampler_var, Decoration::Binding, binding));
            samplers.push(SplitSampler {
                name,
                set,
                binding,
                combined_binding,
            });
        }

        for entry_point in &mut module.entry_points {
            if entry_point.operands.contains(&Operand::IdRef(entry.var)) {
                entry_point.operands.push(Operand::IdRef(entry.sampler_var));
            }
        }
    }

    let mut next_id = next_id();
    for function in &mut module.functions {
        for block in &mut function.blocks {
            let mut rewritten = Vec::with_capacity(block.instructions.len());
            for inst in block.instructions.drain(..) {
                let entry = (inst.class.opcode == Op::Load)
                    .then(|| id_operand(&inst, 0))
                    .flatten()
                    .and_then(|ptr| combined.iter().find(|c| c.var == ptr));
                let (Some(entry), Some(result_type), Some(result_id)) =
                    (entry, inst.result_type, inst.result_id)
                else {
                    rewritten.push(inst);
                    continue;
                };

                let image = next_id;
                let sampler = next_id + 1;
                next_id += 2;
                rewritten.push(Instruction::new(
                    Op::Load,
                    Some(entry.image_type),
                    Some(image),
                    vec![Operand::IdRef(entry.var)],
                ));
                rewritten.push(Instruction::new(
                    Op::Load,
                    Some(sampler_type),
                    Some(sampler),
                    vec![Operand::IdRef(entry.sampler_var)],
                ));
                rewritten.push(Instruction::new(
                    Op::SampledImage,
                    Some(result_type),
                    Some(result_id),
                    vec![Operand::IdRef(image), Operand::IdRef(sampler)],
                ));
            }
            block.instructions = rewritten;
        }
    }

    if let Some(header) = module.header.as_mut() {
        header.bound = next_id;
    }
    log::debug!(
        "Split {} combined image-sampler(s), id bound {} -> {}",
        combined.len(),
        words.get(3).copied().unwrap_or_default(),
        next_id
    );
    Ok(SplitModule {
        words: module.assemble(),
        samplers,
    })
}

fn id_operand(inst: &Instruction, index: usize) -> Option<Word> {
    match inst.operands.get(index)? {
        Operand::IdRef(id) => Some(*id),
        _ => None,
    }
}

fn decorate(id: Word, decoration: Decoration, value: u32) -> Instruction {
    Instruction::new(
        Op::Decorate,
        None,
        None,
        vec![
            Operand::IdRef(id),
            Operand::Decoration(decoration),
            Operand::LiteralBit32(value),
        ],
    )
}

/// `(set, binding)` of every decorated variable.
fn resource_bindings(module: &dr::Module) -> HashMap<Word, (u32, u32)> {
    let mut sets = HashMap::new();
    let mut bindings = HashMap::new();
    for inst in &module.annotations {
        if let [Operand::IdRef(id), Operand::Decoration(d), Operand::LiteralBit32(value)] =
            inst.operands.as_slice()
        {
            match d {
                Decoration::DescriptorSet => {
                    sets.insert(*id, *value);
                }
                Decoration::Binding => {
                    bindings.insert(*id, *value);
                }
                _ => {}
            }
        }
    }
    bindings
        .into_iter()
        .filter_map(|(id, binding)| Some((id, (*sets.get(&id)?, binding))))
        .collect()
}

/// The `OpName` of `id`, or `_<id>` when the module carries no name for it.
fn variable_name(module: &dr::Module, id: Word) -> String {
    module
        .debug_names
        .iter()
        .filter(|inst| inst.class.opcode == Op::Name && id_operand(inst, 0) == Some(id))
        .find_map(|inst| match inst.operands.get(1) {
            Some(Operand::LiteralString(name)) => Some(name.clone()),
            _ => None,
        })
        .unwrap_or_else(|| format!("_{id}"))
}
