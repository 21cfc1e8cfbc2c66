//! Common utilities for export integration tests.
//!
//! A tiny SPIR-V assembler and the fixture modules built with it. Ids are
//! assigned by hand in each fixture; the assembler only encodes words.

#![allow(dead_code)]

use shaderport_compiler::{Backend, ExportSettings, ShaderExporter};
use shaderport_core::{ShaderCache, ShaderLanguage, ShaderStage};
use shaderport_vfs::MemoryProvider;

// ============================================================================
// Assembler
// ============================================================================

const MAGIC: u32 = 0x0723_0203;
const VERSION_1_0: u32 = 0x0001_0000;

/// Opcodes used by the fixtures.
pub mod op {
    pub const NAME: u16 = 5;
    pub const MEMORY_MODEL: u16 = 14;
    pub const ENTRY_POINT: u16 = 15;
    pub const EXECUTION_MODE: u16 = 16;
    pub const CAPABILITY: u16 = 17;
    pub const TYPE_VOID: u16 = 19;
    pub const TYPE_INT: u16 = 21;
    pub const TYPE_FLOAT: u16 = 22;
    pub const TYPE_VECTOR: u16 = 23;
    pub const TYPE_MATRIX: u16 = 24;
    pub const TYPE_IMAGE: u16 = 25;
    pub const TYPE_SAMPLER: u16 = 26;
    pub const TYPE_SAMPLED_IMAGE: u16 = 27;
    pub const TYPE_ARRAY: u16 = 28;
    pub const TYPE_RUNTIME_ARRAY: u16 = 29;
    pub const TYPE_STRUCT: u16 = 30;
    pub const TYPE_POINTER: u16 = 32;
    pub const TYPE_FUNCTION: u16 = 33;
    pub const CONSTANT: u16 = 43;
    pub const CONSTANT_COMPOSITE: u16 = 44;
    pub const FUNCTION: u16 = 54;
    pub const FUNCTION_END: u16 = 56;
    pub const VARIABLE: u16 = 59;
    pub const LOAD: u16 = 61;
    pub const STORE: u16 = 62;
    pub const ACCESS_CHAIN: u16 = 65;
    pub const DECORATE: u16 = 71;
    pub const MEMBER_DECORATE: u16 = 72;
    pub const SAMPLED_IMAGE: u16 = 86;
    pub const IMAGE_SAMPLE_IMPLICIT_LOD: u16 = 87;
    pub const F_ADD: u16 = 129;
    pub const F_MUL: u16 = 133;
    pub const LABEL: u16 = 248;
    pub const RETURN: u16 = 253;
}

/// Enumerant values used by the fixtures.
pub mod value {
    pub const CAPABILITY_SHADER: u32 = 1;
    pub const ADDRESSING_LOGICAL: u32 = 0;
    pub const MEMORY_GLSL450: u32 = 1;
    pub const MODEL_FRAGMENT: u32 = 4;
    pub const MODE_ORIGIN_UPPER_LEFT: u32 = 7;
    pub const DIM_2D: u32 = 1;
    pub const FORMAT_UNKNOWN: u32 = 0;

    pub const CLASS_UNIFORM_CONSTANT: u32 = 0;
    pub const CLASS_INPUT: u32 = 1;
    pub const CLASS_UNIFORM: u32 = 2;
    pub const CLASS_OUTPUT: u32 = 3;
    pub const CLASS_PUSH_CONSTANT: u32 = 9;

    pub const DECORATION_BLOCK: u32 = 2;
    pub const DECORATION_BUFFER_BLOCK: u32 = 3;
    pub const DECORATION_COL_MAJOR: u32 = 5;
    pub const DECORATION_ARRAY_STRIDE: u32 = 6;
    pub const DECORATION_MATRIX_STRIDE: u32 = 7;
    pub const DECORATION_LOCATION: u32 = 30;
    pub const DECORATION_BINDING: u32 = 33;
    pub const DECORATION_DESCRIPTOR_SET: u32 = 34;
    pub const DECORATION_OFFSET: u32 = 35;
}

/// Encodes SPIR-V instructions into words.
pub struct Assembler {
    words: Vec<u32>,
}

impl Assembler {
    /// Start a module whose ids are all below `bound`.
    pub fn new(bound: u32) -> Self {
        Self {
            words: vec![MAGIC, VERSION_1_0, 0, bound, 0],
        }
    }

    pub fn inst(&mut self, opcode: u16, operands: &[u32]) -> &mut Self {
        let count = operands.len() as u32 + 1;
        self.words.push((count << 16) | opcode as u32);
        self.words.extend_from_slice(operands);
        self
    }

    /// Instruction with a literal string between `before` and `after`.
    pub fn inst_str(&mut self, opcode: u16, before: &[u32], text: &str, after: &[u32]) -> &mut Self {
        let mut operands = before.to_vec();
        operands.extend(string_words(text));
        operands.extend_from_slice(after);
        self.inst(opcode, &operands)
    }

    pub fn name(&mut self, id: u32, name: &str) -> &mut Self {
        self.inst_str(op::NAME, &[id], name, &[])
    }

    pub fn decorate(&mut self, id: u32, decoration: u32, literal: Option<u32>) -> &mut Self {
        match literal {
            Some(value) => self.inst(op::DECORATE, &[id, decoration, value]),
            None => self.inst(op::DECORATE, &[id, decoration]),
        }
    }

    pub fn member_decorate(
        &mut self,
        id: u32,
        member: u32,
        decoration: u32,
        literal: Option<u32>,
    ) -> &mut Self {
        match literal {
            Some(value) => self.inst(op::MEMBER_DECORATE, &[id, member, decoration, value]),
            None => self.inst(op::MEMBER_DECORATE, &[id, member, decoration]),
        }
    }

    pub fn finish(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.words)
    }
}

/// Nul-terminated UTF-8, padded to whole words.
fn string_words(text: &str) -> Vec<u32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_ne_bytes()).collect()
}

// ============================================================================
// Fixtures
// ============================================================================

/// Fragment shader sampling a combined image-sampler:
///
/// ```glsl
/// layout(set = 0, binding = 0) uniform sampler2D tex;
/// layout(location = 0) in vec2 uv;
/// layout(location = 0) out vec4 color;
/// void main() { color = texture(tex, uv); }
/// ```
pub fn textured_fragment() -> Vec<u32> {
    fragment_module(false, false)
}

/// [`textured_fragment`] plus a separate texture at binding 1 the body never
/// reads.
pub fn textured_fragment_with_unused_texture() -> Vec<u32> {
    fragment_module(true, false)
}

/// [`textured_fragment`] with an `OpTypeSampler` declared after every
/// variable.
pub fn textured_fragment_with_late_sampler_type() -> Vec<u32> {
    fragment_module(false, true)
}

fn fragment_module(with_unused: bool, late_sampler: bool) -> Vec<u32> {
    use value::*;

    const VOID: u32 = 1;
    const FN_VOID: u32 = 2;
    const FLOAT: u32 = 3;
    const VEC2: u32 = 4;
    const VEC4: u32 = 5;
    const IMAGE: u32 = 6;
    const SAMPLED_IMAGE: u32 = 7;
    const PTR_SAMPLED_IMAGE: u32 = 8;
    const TEX: u32 = 9;
    const PTR_IN_VEC2: u32 = 10;
    const UV: u32 = 11;
    const PTR_OUT_VEC4: u32 = 12;
    const COLOR: u32 = 13;
    const MAIN: u32 = 14;
    const LABEL: u32 = 15;
    const LOADED_TEX: u32 = 16;
    const LOADED_UV: u32 = 17;
    const SAMPLED: u32 = 18;
    const PTR_IMAGE: u32 = 19;
    const UNUSED: u32 = 20;
    const SAMPLER: u32 = 21;

    let mut asm = Assembler::new(22);
    asm.inst(op::CAPABILITY, &[CAPABILITY_SHADER])
        .inst(op::MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .inst_str(op::ENTRY_POINT, &[MODEL_FRAGMENT, MAIN], "main", &[UV, COLOR])
        .inst(op::EXECUTION_MODE, &[MAIN, MODE_ORIGIN_UPPER_LEFT])
        .name(MAIN, "main")
        .name(TEX, "tex")
        .name(UV, "uv")
        .name(COLOR, "color");
    if with_unused {
        asm.name(UNUSED, "unused");
    }

    asm.decorate(TEX, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(TEX, DECORATION_BINDING, Some(0))
        .decorate(UV, DECORATION_LOCATION, Some(0))
        .decorate(COLOR, DECORATION_LOCATION, Some(0));
    if with_unused {
        asm.decorate(UNUSED, DECORATION_DESCRIPTOR_SET, Some(0))
            .decorate(UNUSED, DECORATION_BINDING, Some(1));
    }

    asm.inst(op::TYPE_VOID, &[VOID])
        .inst(op::TYPE_FUNCTION, &[FN_VOID, VOID])
        .inst(op::TYPE_FLOAT, &[FLOAT, 32])
        .inst(op::TYPE_VECTOR, &[VEC2, FLOAT, 2])
        .inst(op::TYPE_VECTOR, &[VEC4, FLOAT, 4])
        .inst(op::TYPE_IMAGE, &[IMAGE, FLOAT, DIM_2D, 0, 0, 0, 1, FORMAT_UNKNOWN])
        .inst(op::TYPE_SAMPLED_IMAGE, &[SAMPLED_IMAGE, IMAGE])
        .inst(op::TYPE_POINTER, &[PTR_SAMPLED_IMAGE, CLASS_UNIFORM_CONSTANT, SAMPLED_IMAGE])
        .inst(op::VARIABLE, &[PTR_SAMPLED_IMAGE, TEX, CLASS_UNIFORM_CONSTANT])
        .inst(op::TYPE_POINTER, &[PTR_IN_VEC2, CLASS_INPUT, VEC2])
        .inst(op::VARIABLE, &[PTR_IN_VEC2, UV, CLASS_INPUT])
        .inst(op::TYPE_POINTER, &[PTR_OUT_VEC4, CLASS_OUTPUT, VEC4])
        .inst(op::VARIABLE, &[PTR_OUT_VEC4, COLOR, CLASS_OUTPUT]);
    if with_unused {
        asm.inst(op::TYPE_POINTER, &[PTR_IMAGE, CLASS_UNIFORM_CONSTANT, IMAGE])
            .inst(op::VARIABLE, &[PTR_IMAGE, UNUSED, CLASS_UNIFORM_CONSTANT]);
    }
    if late_sampler {
        asm.inst(op::TYPE_SAMPLER, &[SAMPLER]);
    }

    asm.inst(op::FUNCTION, &[VOID, MAIN, 0, FN_VOID])
        .inst(op::LABEL, &[LABEL])
        .inst(op::LOAD, &[SAMPLED_IMAGE, LOADED_TEX, TEX])
        .inst(op::LOAD, &[VEC2, LOADED_UV, UV])
        .inst(op::IMAGE_SAMPLE_IMPLICIT_LOD, &[VEC4, SAMPLED, LOADED_TEX, LOADED_UV])
        .inst(op::STORE, &[COLOR, SAMPLED])
        .inst(op::RETURN, &[])
        .inst(op::FUNCTION_END, &[]);
    asm.finish()
}

/// Module exercising every reflected resource kind:
///
/// ```glsl
/// layout(set = 0, binding = 0) uniform Globals { mat4 view; vec4 tint; } globals;
/// layout(push_constant) uniform PushData { vec4 color; float scale; } pc;
/// layout(set = 0, binding = 1) uniform texture2D textures[4];
/// layout(set = 1, binding = 0) buffer Particles { float data[]; } particles;
/// layout(set = 0, binding = 2) uniform sampler samp;
/// layout(location = 0) out vec4 color;
/// ```
pub fn reflection_module() -> Vec<u32> {
    use value::*;

    const VOID: u32 = 1;
    const FN_VOID: u32 = 2;
    const FLOAT: u32 = 3;
    const VEC4: u32 = 4;
    const MAT4: u32 = 5;
    const GLOBALS_T: u32 = 6;
    const PTR_GLOBALS: u32 = 7;
    const GLOBALS: u32 = 8;
    const PUSH_T: u32 = 9;
    const PTR_PUSH: u32 = 10;
    const PC: u32 = 11;
    const UINT: u32 = 12;
    const FOUR: u32 = 13;
    const IMAGE: u32 = 14;
    const IMAGE_ARRAY: u32 = 15;
    const PTR_IMAGE_ARRAY: u32 = 16;
    const TEXTURES: u32 = 17;
    const FLOAT_RUNTIME_ARRAY: u32 = 18;
    const PARTICLES_T: u32 = 19;
    const PTR_PARTICLES: u32 = 20;
    const PARTICLES: u32 = 21;
    const SAMPLER: u32 = 22;
    const PTR_SAMPLER: u32 = 23;
    const SAMP: u32 = 24;
    const PTR_OUT_VEC4: u32 = 25;
    const COLOR: u32 = 26;
    const MAIN: u32 = 27;
    const LABEL: u32 = 28;

    Assembler::new(29)
        .inst(op::CAPABILITY, &[CAPABILITY_SHADER])
        .inst(op::MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .inst_str(op::ENTRY_POINT, &[MODEL_FRAGMENT, MAIN], "main", &[COLOR])
        .inst(op::EXECUTION_MODE, &[MAIN, MODE_ORIGIN_UPPER_LEFT])
        .name(MAIN, "main")
        .name(GLOBALS_T, "Globals")
        .name(GLOBALS, "globals")
        .name(PUSH_T, "PushData")
        .name(PC, "pc")
        .name(TEXTURES, "textures")
        .name(PARTICLES_T, "Particles")
        .name(PARTICLES, "particles")
        .name(SAMP, "samp")
        .name(COLOR, "color")
        .decorate(GLOBALS_T, DECORATION_BLOCK, None)
        .member_decorate(GLOBALS_T, 0, DECORATION_OFFSET, Some(0))
        .member_decorate(GLOBALS_T, 0, DECORATION_COL_MAJOR, None)
        .member_decorate(GLOBALS_T, 0, DECORATION_MATRIX_STRIDE, Some(16))
        .member_decorate(GLOBALS_T, 1, DECORATION_OFFSET, Some(64))
        .decorate(GLOBALS, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(GLOBALS, DECORATION_BINDING, Some(0))
        .decorate(PUSH_T, DECORATION_BLOCK, None)
        .member_decorate(PUSH_T, 0, DECORATION_OFFSET, Some(0))
        .member_decorate(PUSH_T, 1, DECORATION_OFFSET, Some(16))
        .decorate(TEXTURES, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(TEXTURES, DECORATION_BINDING, Some(1))
        .decorate(FLOAT_RUNTIME_ARRAY, DECORATION_ARRAY_STRIDE, Some(4))
        .decorate(PARTICLES_T, DECORATION_BUFFER_BLOCK, None)
        .member_decorate(PARTICLES_T, 0, DECORATION_OFFSET, Some(0))
        .decorate(PARTICLES, DECORATION_DESCRIPTOR_SET, Some(1))
        .decorate(PARTICLES, DECORATION_BINDING, Some(0))
        .decorate(SAMP, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(SAMP, DECORATION_BINDING, Some(2))
        .decorate(COLOR, DECORATION_LOCATION, Some(0))
        .inst(op::TYPE_VOID, &[VOID])
        .inst(op::TYPE_FUNCTION, &[FN_VOID, VOID])
        .inst(op::TYPE_FLOAT, &[FLOAT, 32])
        .inst(op::TYPE_VECTOR, &[VEC4, FLOAT, 4])
        .inst(op::TYPE_MATRIX, &[MAT4, VEC4, 4])
        .inst(op::TYPE_STRUCT, &[GLOBALS_T, MAT4, VEC4])
        .inst(op::TYPE_POINTER, &[PTR_GLOBALS, CLASS_UNIFORM, GLOBALS_T])
        .inst(op::VARIABLE, &[PTR_GLOBALS, GLOBALS, CLASS_UNIFORM])
        .inst(op::TYPE_STRUCT, &[PUSH_T, VEC4, FLOAT])
        .inst(op::TYPE_POINTER, &[PTR_PUSH, CLASS_PUSH_CONSTANT, PUSH_T])
        .inst(op::VARIABLE, &[PTR_PUSH, PC, CLASS_PUSH_CONSTANT])
        .inst(op::TYPE_INT, &[UINT, 32, 0])
        .inst(op::CONSTANT, &[UINT, FOUR, 4])
        .inst(op::TYPE_IMAGE, &[IMAGE, FLOAT, DIM_2D, 0, 0, 0, 1, FORMAT_UNKNOWN])
        .inst(op::TYPE_ARRAY, &[IMAGE_ARRAY, IMAGE, FOUR])
        .inst(op::TYPE_POINTER, &[PTR_IMAGE_ARRAY, CLASS_UNIFORM_CONSTANT, IMAGE_ARRAY])
        .inst(op::VARIABLE, &[PTR_IMAGE_ARRAY, TEXTURES, CLASS_UNIFORM_CONSTANT])
        .inst(op::TYPE_RUNTIME_ARRAY, &[FLOAT_RUNTIME_ARRAY, FLOAT])
        .inst(op::TYPE_STRUCT, &[PARTICLES_T, FLOAT_RUNTIME_ARRAY])
        .inst(op::TYPE_POINTER, &[PTR_PARTICLES, CLASS_UNIFORM, PARTICLES_T])
        .inst(op::VARIABLE, &[PTR_PARTICLES, PARTICLES, CLASS_UNIFORM])
        .inst(op::TYPE_SAMPLER, &[SAMPLER])
        .inst(op::TYPE_POINTER, &[PTR_SAMPLER, CLASS_UNIFORM_CONSTANT, SAMPLER])
        .inst(op::VARIABLE, &[PTR_SAMPLER, SAMP, CLASS_UNIFORM_CONSTANT])
        .inst(op::TYPE_POINTER, &[PTR_OUT_VEC4, CLASS_OUTPUT, VEC4])
        .inst(op::VARIABLE, &[PTR_OUT_VEC4, COLOR, CLASS_OUTPUT])
        .inst(op::FUNCTION, &[VOID, MAIN, 0, FN_VOID])
        .inst(op::LABEL, &[LABEL])
        .inst(op::RETURN, &[])
        .inst(op::FUNCTION_END, &[])
        .finish()
}

/// Fragment shader reading one resource of every table, with digit-suffixed
/// identifiers the decompiler renames:
///
/// ```glsl
/// layout(set = 0, binding = 0) uniform Params0 { vec4 tint; } params0;
/// layout(push_constant) uniform PushData { vec4 scale; } pc;
/// layout(set = 1, binding = 0) buffer Particles { vec4 data; } particles;
/// layout(set = 0, binding = 1) uniform texture2D tex0;
/// layout(set = 0, binding = 2) uniform sampler samp;
/// layout(location = 0) out vec4 color;
/// void main() {
///     vec4 s = texture(sampler2D(tex0, samp), vec2(0.5));
///     color = s * params0.tint * pc.scale + particles.data;
/// }
/// ```
pub fn resource_fragment() -> Vec<u32> {
    use value::*;

    const VOID: u32 = 1;
    const FN_VOID: u32 = 2;
    const FLOAT: u32 = 3;
    const VEC2: u32 = 4;
    const VEC4: u32 = 5;
    const INT: u32 = 6;
    const ZERO: u32 = 7;
    const HALF: u32 = 8;
    const UV: u32 = 9;
    const PARAMS_T: u32 = 10;
    const PTR_PARAMS: u32 = 11;
    const PARAMS: u32 = 12;
    const PTR_UNIFORM_VEC4: u32 = 13;
    const PUSH_T: u32 = 14;
    const PTR_PUSH: u32 = 15;
    const PC: u32 = 16;
    const PTR_PUSH_VEC4: u32 = 17;
    const PARTICLES_T: u32 = 18;
    const PTR_PARTICLES: u32 = 19;
    const PARTICLES: u32 = 20;
    const IMAGE: u32 = 21;
    const PTR_IMAGE: u32 = 22;
    const TEX: u32 = 23;
    const SAMPLER: u32 = 24;
    const PTR_SAMPLER: u32 = 25;
    const SAMP: u32 = 26;
    const SAMPLED_IMAGE: u32 = 27;
    const PTR_OUT_VEC4: u32 = 28;
    const COLOR: u32 = 29;
    const MAIN: u32 = 30;
    const LABEL: u32 = 31;
    const TINT_PTR: u32 = 32;
    const TINT: u32 = 33;
    const SCALE_PTR: u32 = 34;
    const SCALE: u32 = 35;
    const DATA_PTR: u32 = 36;
    const DATA: u32 = 37;
    const LOADED_TEX: u32 = 38;
    const LOADED_SAMP: u32 = 39;
    const COMBINED: u32 = 40;
    const SAMPLED: u32 = 41;
    const TINTED: u32 = 42;
    const SCALED: u32 = 43;
    const RESULT: u32 = 44;

    Assembler::new(45)
        .inst(op::CAPABILITY, &[CAPABILITY_SHADER])
        .inst(op::MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .inst_str(op::ENTRY_POINT, &[MODEL_FRAGMENT, MAIN], "main", &[COLOR])
        .inst(op::EXECUTION_MODE, &[MAIN, MODE_ORIGIN_UPPER_LEFT])
        .name(MAIN, "main")
        .name(PARAMS_T, "Params0")
        .name(PARAMS, "params0")
        .name(PUSH_T, "PushData")
        .name(PC, "pc")
        .name(PARTICLES_T, "Particles")
        .name(PARTICLES, "particles")
        .name(TEX, "tex0")
        .name(SAMP, "samp")
        .name(COLOR, "color")
        .decorate(PARAMS_T, DECORATION_BLOCK, None)
        .member_decorate(PARAMS_T, 0, DECORATION_OFFSET, Some(0))
        .decorate(PARAMS, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(PARAMS, DECORATION_BINDING, Some(0))
        .decorate(PUSH_T, DECORATION_BLOCK, None)
        .member_decorate(PUSH_T, 0, DECORATION_OFFSET, Some(0))
        .decorate(PARTICLES_T, DECORATION_BUFFER_BLOCK, None)
        .member_decorate(PARTICLES_T, 0, DECORATION_OFFSET, Some(0))
        .decorate(PARTICLES, DECORATION_DESCRIPTOR_SET, Some(1))
        .decorate(PARTICLES, DECORATION_BINDING, Some(0))
        .decorate(TEX, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(TEX, DECORATION_BINDING, Some(1))
        .decorate(SAMP, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(SAMP, DECORATION_BINDING, Some(2))
        .decorate(COLOR, DECORATION_LOCATION, Some(0))
        .inst(op::TYPE_VOID, &[VOID])
        .inst(op::TYPE_FUNCTION, &[FN_VOID, VOID])
        .inst(op::TYPE_FLOAT, &[FLOAT, 32])
        .inst(op::TYPE_VECTOR, &[VEC2, FLOAT, 2])
        .inst(op::TYPE_VECTOR, &[VEC4, FLOAT, 4])
        .inst(op::TYPE_INT, &[INT, 32, 1])
        .inst(op::CONSTANT, &[INT, ZERO, 0])
        .inst(op::CONSTANT, &[FLOAT, HALF, 0.5f32.to_bits()])
        .inst(op::CONSTANT_COMPOSITE, &[VEC2, UV, HALF, HALF])
        .inst(op::TYPE_STRUCT, &[PARAMS_T, VEC4])
        .inst(op::TYPE_POINTER, &[PTR_PARAMS, CLASS_UNIFORM, PARAMS_T])
        .inst(op::VARIABLE, &[PTR_PARAMS, PARAMS, CLASS_UNIFORM])
        .inst(op::TYPE_POINTER, &[PTR_UNIFORM_VEC4, CLASS_UNIFORM, VEC4])
        .inst(op::TYPE_STRUCT, &[PUSH_T, VEC4])
        .inst(op::TYPE_POINTER, &[PTR_PUSH, CLASS_PUSH_CONSTANT, PUSH_T])
        .inst(op::VARIABLE, &[PTR_PUSH, PC, CLASS_PUSH_CONSTANT])
        .inst(op::TYPE_POINTER, &[PTR_PUSH_VEC4, CLASS_PUSH_CONSTANT, VEC4])
        .inst(op::TYPE_STRUCT, &[PARTICLES_T, VEC4])
        .inst(op::TYPE_POINTER, &[PTR_PARTICLES, CLASS_UNIFORM, PARTICLES_T])
        .inst(op::VARIABLE, &[PTR_PARTICLES, PARTICLES, CLASS_UNIFORM])
        .inst(op::TYPE_IMAGE, &[IMAGE, FLOAT, DIM_2D, 0, 0, 0, 1, FORMAT_UNKNOWN])
        .inst(op::TYPE_POINTER, &[PTR_IMAGE, CLASS_UNIFORM_CONSTANT, IMAGE])
        .inst(op::VARIABLE, &[PTR_IMAGE, TEX, CLASS_UNIFORM_CONSTANT])
        .inst(op::TYPE_SAMPLER, &[SAMPLER])
        .inst(op::TYPE_POINTER, &[PTR_SAMPLER, CLASS_UNIFORM_CONSTANT, SAMPLER])
        .inst(op::VARIABLE, &[PTR_SAMPLER, SAMP, CLASS_UNIFORM_CONSTANT])
        .inst(op::TYPE_SAMPLED_IMAGE, &[SAMPLED_IMAGE, IMAGE])
        .inst(op::TYPE_POINTER, &[PTR_OUT_VEC4, CLASS_OUTPUT, VEC4])
        .inst(op::VARIABLE, &[PTR_OUT_VEC4, COLOR, CLASS_OUTPUT])
        .inst(op::FUNCTION, &[VOID, MAIN, 0, FN_VOID])
        .inst(op::LABEL, &[LABEL])
        .inst(op::ACCESS_CHAIN, &[PTR_UNIFORM_VEC4, TINT_PTR, PARAMS, ZERO])
        .inst(op::LOAD, &[VEC4, TINT, TINT_PTR])
        .inst(op::ACCESS_CHAIN, &[PTR_PUSH_VEC4, SCALE_PTR, PC, ZERO])
        .inst(op::LOAD, &[VEC4, SCALE, SCALE_PTR])
        .inst(op::ACCESS_CHAIN, &[PTR_UNIFORM_VEC4, DATA_PTR, PARTICLES, ZERO])
        .inst(op::LOAD, &[VEC4, DATA, DATA_PTR])
        .inst(op::LOAD, &[IMAGE, LOADED_TEX, TEX])
        .inst(op::LOAD, &[SAMPLER, LOADED_SAMP, SAMP])
        .inst(op::SAMPLED_IMAGE, &[SAMPLED_IMAGE, COMBINED, LOADED_TEX, LOADED_SAMP])
        .inst(op::IMAGE_SAMPLE_IMPLICIT_LOD, &[VEC4, SAMPLED, COMBINED, UV])
        .inst(op::F_MUL, &[VEC4, TINTED, SAMPLED, TINT])
        .inst(op::F_MUL, &[VEC4, SCALED, TINTED, SCALE])
        .inst(op::F_ADD, &[VEC4, RESULT, SCALED, DATA])
        .inst(op::STORE, &[COLOR, RESULT])
        .inst(op::RETURN, &[])
        .inst(op::FUNCTION_END, &[])
        .finish()
}

/// Push constant block whose byte size does not fit in 32 bits:
///
/// ```glsl
/// layout(push_constant) uniform Huge { vec4 data[0x10000000]; } pc;
/// ```
pub fn oversized_push_constant() -> Vec<u32> {
    use value::*;

    const FLOAT: u32 = 1;
    const VEC4: u32 = 2;
    const UINT: u32 = 3;
    const LENGTH: u32 = 4;
    const ARRAY: u32 = 5;
    const HUGE_T: u32 = 6;
    const PTR_HUGE: u32 = 7;
    const PC: u32 = 8;

    Assembler::new(9)
        .inst(op::CAPABILITY, &[CAPABILITY_SHADER])
        .inst(op::MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .name(HUGE_T, "Huge")
        .name(PC, "pc")
        .decorate(ARRAY, DECORATION_ARRAY_STRIDE, Some(16))
        .decorate(HUGE_T, DECORATION_BLOCK, None)
        .member_decorate(HUGE_T, 0, DECORATION_OFFSET, Some(0))
        .inst(op::TYPE_FLOAT, &[FLOAT, 32])
        .inst(op::TYPE_VECTOR, &[VEC4, FLOAT, 4])
        .inst(op::TYPE_INT, &[UINT, 32, 0])
        .inst(op::CONSTANT, &[UINT, LENGTH, 0x1000_0000])
        .inst(op::TYPE_ARRAY, &[ARRAY, VEC4, LENGTH])
        .inst(op::TYPE_STRUCT, &[HUGE_T, ARRAY])
        .inst(op::TYPE_POINTER, &[PTR_HUGE, CLASS_PUSH_CONSTANT, HUGE_T])
        .inst(op::VARIABLE, &[PTR_HUGE, PC, CLASS_PUSH_CONSTANT])
        .finish()
}

/// Texture array whose element count does not fit in 32 bits:
///
/// ```glsl
/// layout(set = 0, binding = 0) uniform texture2D grid[0x10000][0x10000];
/// ```
pub fn oversized_texture_array() -> Vec<u32> {
    use value::*;

    const FLOAT: u32 = 1;
    const UINT: u32 = 2;
    const LENGTH: u32 = 3;
    const IMAGE: u32 = 4;
    const ROW: u32 = 5;
    const GRID_T: u32 = 6;
    const PTR_GRID: u32 = 7;
    const GRID: u32 = 8;

    Assembler::new(9)
        .inst(op::CAPABILITY, &[CAPABILITY_SHADER])
        .inst(op::MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .name(GRID, "grid")
        .decorate(GRID, DECORATION_DESCRIPTOR_SET, Some(0))
        .decorate(GRID, DECORATION_BINDING, Some(0))
        .inst(op::TYPE_FLOAT, &[FLOAT, 32])
        .inst(op::TYPE_INT, &[UINT, 32, 0])
        .inst(op::CONSTANT, &[UINT, LENGTH, 0x1_0000])
        .inst(op::TYPE_IMAGE, &[IMAGE, FLOAT, DIM_2D, 0, 0, 0, 1, FORMAT_UNKNOWN])
        .inst(op::TYPE_ARRAY, &[ROW, IMAGE, LENGTH])
        .inst(op::TYPE_ARRAY, &[GRID_T, ROW, LENGTH])
        .inst(op::TYPE_POINTER, &[PTR_GRID, CLASS_UNIFORM_CONSTANT, GRID_T])
        .inst(op::VARIABLE, &[PTR_GRID, GRID, CLASS_UNIFORM_CONSTANT])
        .finish()
}

/// PSSL the reference backend would see for [`reflection_module`], with
/// every resource referenced.
pub const REFLECTION_PSSL: &str = r#"
struct Globals {
    row_major float4x4 view;
    float4 tint;
};

struct PushData {
    float4 color;
    float scale;
};

ConstantBuffer Globals { Globals globals; }
ConstantBuffer<PushData> pc;
Texture2D<float4> textures[4];
ByteBuffer particles;
SamplerState samp;

float4 main() : S_TARGET_OUTPUT0 {
    float4 c = textures[2].Sample(samp, float2(0.5, 0.5)) * pc.color * pc.scale;
    return mul(globals.view, c) + globals.tint + asfloat(particles.Load(0));
}
"#;

// ============================================================================
// Export helpers
// ============================================================================

/// A cache holding `programs` as fragment shaders, in insertion order of their hashes.
pub fn fragment_cache(programs: &[Vec<u32>]) -> (ShaderCache, Vec<String>) {
    let cache = ShaderCache::new();
    let hashes = programs
        .iter()
        .map(|words| {
            cache
                .insert(ShaderStage::Fragment, ShaderLanguage::Glsl, "", &to_bytes(words))
                .expect("aligned IR")
                .expect("non-empty IR")
        })
        .collect();
    (cache, hashes)
}

/// Route pipeline logs to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn exporter(storage: &MemoryProvider, settings: ExportSettings) -> ShaderExporter {
    init_logging();
    let backend = Backend::create(settings.backend, None).expect("dummy backend");
    ShaderExporter::new(Box::new(storage.clone()), settings, backend)
}
