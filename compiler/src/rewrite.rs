//! HLSL to PSSL source rewriting.
//!
//! The decompiled HLSL is close enough to PSSL that an ordered list of
//! textual substitutions finishes the job. The rules run in the order of
//! [`RULES`]; a later rule sees the output of every earlier one.
//!
//! | # | HLSL | PSSL |
//! |---|------|------|
//! | 1 | `cbuffer` | `ConstantBuffer` |
//! | 2 | `SV_VertexID`, `SV_Position`, `SV_InstanceID`, `SV_Target`, `SV_IsFrontFace`, `SV_DispatchThreadID`, `SV_GroupThreadID` | `S_VERTEX_ID`, `S_POSITION`, ... |
//! | 3 | `RWTexture3D`, `RWTexture2D`, `TextureCubeArray` | `RW_Texture3D`, `RW_Texture2D`, `TextureCube_Array` |
//! | 4 | `SampleLevel` | `SampleLOD` |
//! | 5 | `Buffer<` | `RegularBuffer<` |
//! | 6 | `RWByteAddressBuffer`, `ByteAddressBuffer` | `RW_ByteBuffer`, `ByteBuffer` |
//! | 7 | `groupshared`, `AllMemoryBarrier`, `GroupMemoryBarrierWithGroupSync` | `thread_group_memory`, `ThreadGroupMemoryBarrier`, `ThreadGroupMemoryBarrierSync` |
//! | 8 | `nointerpolation`, `numthreads` | `nointerp`, `NUM_THREADS` |
//! | 9 | `: register(...)` | removed |
//! | 10 | `<unorm ` | `<` |

use std::sync::LazyLock;

use regex::Regex;

use crate::config::CompilationConfiguration;

/// Reinterprets a `uint4x4` as `float4x4`, which PSSL has no intrinsic for.
pub const ASFLOAT_UINT4X4_HELPER: &str =
    "float4x4 asfloat(uint4x4 x) { union { uint4x4 i; float4x4 f; } u; u.i = x; return u.f; }\n";

struct RewriteRule {
    pattern: Regex,
    replacement: &'static str,
}

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    [
        // 1
        (r"\bcbuffer\b", "ConstantBuffer"),
        // 2
        (r"\bSV_VertexID\b", "S_VERTEX_ID"),
        (r"\bSV_Position\b", "S_POSITION"),
        (r"\bSV_InstanceID\b", "S_INSTANCE_ID"),
        (r"\bSV_Target", "S_TARGET_OUTPUT"),
        (r"\bSV_IsFrontFace\b", "S_FRONT_FACE"),
        (r"\bSV_DispatchThreadID\b", "S_DISPATCH_THREAD_ID"),
        (r"\bSV_GroupThreadID\b", "S_GROUP_THREAD_ID"),
        // 3
        (r"\bRWTexture3D", "RW_Texture3D"),
        (r"\bRWTexture2D", "RW_Texture2D"),
        (r"\bTextureCubeArray\b", "TextureCube_Array"),
        // 4
        (r"\bSampleLevel\b", "SampleLOD"),
        // 5: ConstantBuffer< has no word boundary before "Buffer"
        (r"\bBuffer<", "RegularBuffer<"),
        // 6
        (r"\bRWByteAddressBuffer\b", "RW_ByteBuffer"),
        (r"\bByteAddressBuffer\b", "ByteBuffer"),
        // 7
        (r"\bgroupshared\b", "thread_group_memory"),
        (r"\bAllMemoryBarrier\b", "ThreadGroupMemoryBarrier"),
        (
            r"\bGroupMemoryBarrierWithGroupSync\b",
            "ThreadGroupMemoryBarrierSync",
        ),
        // 8
        (r"\bnointerpolation\b", "nointerp"),
        (r"\bnumthreads\b", "NUM_THREADS"),
        // 9
        (r"\s*:\s*register\s*\([^)]*\)", ""),
        // 10
        (r"<unorm ", "<"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| RewriteRule {
        pattern: Regex::new(pattern).expect("invalid rewrite pattern"),
        replacement,
    })
    .collect()
});

static ASFLOAT_UINT4X4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"asfloat\(\s*uint4x4").expect("invalid asfloat pattern"));

static TEXTURE_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:RW_)?Texture\w*(?:\s*<[^>;]*>)?\s+\w+\s*\[\s*\d+\s*\]\s*;")
        .expect("invalid texture array pattern")
});

/// Rewrite decompiled HLSL into PSSL.
///
/// Sets `config.unroll` when the result declares a fixed-size texture array,
/// since the vendor compiler only indexes such arrays inside fully unrolled
/// loops.
pub fn hlsl_to_pssl(hlsl: &str, config: &mut CompilationConfiguration) -> String {
    let mut output = if ASFLOAT_UINT4X4.is_match(hlsl) {
        format!("{ASFLOAT_UINT4X4_HELPER}{hlsl}")
    } else {
        hlsl.to_owned()
    };

    for rule in RULES.iter() {
        output = rule
            .pattern
            .replace_all(&output, rule.replacement)
            .into_owned();
    }

    if TEXTURE_ARRAY.is_match(&output) {
        log::debug!("Texture array found, enabling loop unrolling");
        config.unroll = true;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaderport_core::ShaderStage;

    fn rewrite(src: &str) -> (String, CompilationConfiguration) {
        let mut config = CompilationConfiguration::new(ShaderStage::Fragment);
        let out = hlsl_to_pssl(src, &mut config);
        (out, config)
    }

    #[test]
    fn constant_buffer_keyword_and_register_strip() {
        let (out, _) = rewrite("cbuffer Globals : register(b0) { Globals globals; }");
        assert_eq!(out, "ConstantBuffer Globals { Globals globals; }");
    }

    #[test]
    fn typed_constant_buffer_is_not_a_regular_buffer() {
        let (out, _) = rewrite(
            "ConstantBuffer<PushData> pc : register(b0);\nBuffer<float4> data : register(t1);",
        );
        assert_eq!(
            out,
            "ConstantBuffer<PushData> pc;\nRegularBuffer<float4> data;"
        );
    }

    #[test]
    fn system_value_semantics() {
        let (out, _) = rewrite(
            "float4 p : SV_Position; uint v : SV_VertexID; uint i : SV_InstanceID; \
             float4 c : SV_Target0; bool f : SV_IsFrontFace; \
             uint3 d : SV_DispatchThreadID; uint3 g : SV_GroupThreadID;",
        );
        assert_eq!(
            out,
            "float4 p : S_POSITION; uint v : S_VERTEX_ID; uint i : S_INSTANCE_ID; \
             float4 c : S_TARGET_OUTPUT0; bool f : S_FRONT_FACE; \
             uint3 d : S_DISPATCH_THREAD_ID; uint3 g : S_GROUP_THREAD_ID;"
        );
    }

    #[test]
    fn texture_and_buffer_types() {
        let (out, _) = rewrite(
            "RWTexture2D<float4> a; RWTexture3D<float> b; TextureCubeArray<float4> c; \
             RWTexture2DArray<uint> d; RWByteAddressBuffer e; ByteAddressBuffer f;",
        );
        assert_eq!(
            out,
            "RW_Texture2D<float4> a; RW_Texture3D<float> b; TextureCube_Array<float4> c; \
             RW_Texture2DArray<uint> d; RW_ByteBuffer e; ByteBuffer f;"
        );
    }

    #[test]
    fn compute_syntax() {
        let (out, _) = rewrite(
            "groupshared float cache[64];\n[numthreads(8, 8, 1)]\nvoid main() { \
             GroupMemoryBarrierWithGroupSync(); AllMemoryBarrier(); }",
        );
        assert_eq!(
            out,
            "thread_group_memory float cache[64];\n[NUM_THREADS(8, 8, 1)]\nvoid main() { \
             ThreadGroupMemoryBarrierSync(); ThreadGroupMemoryBarrier(); }"
        );
    }

    #[test]
    fn sample_level_and_interpolation() {
        let (out, _) = rewrite("nointerpolation uint id : TEXCOORD1; x = t.SampleLevel(s, uv, 0);");
        assert_eq!(out, "nointerp uint id : TEXCOORD1; x = t.SampleLOD(s, uv, 0);");
    }

    #[test]
    fn unorm_qualifier_stripped() {
        let (out, _) = rewrite("RWTexture2D<unorm float4> img : register(u0);");
        assert_eq!(out, "RW_Texture2D<float4> img;");
    }

    #[test]
    fn asfloat_helper_prepended_once() {
        let (out, _) = rewrite("float4x4 m = asfloat(uint4x4(a, b, c, d));");
        assert!(out.starts_with(ASFLOAT_UINT4X4_HELPER));
        assert_eq!(out.matches("union").count(), 1);

        let (plain, _) = rewrite("float4 v = asfloat(uint4(a, b, c, d));");
        assert!(!plain.contains("union"));
    }

    #[test]
    fn texture_array_enables_unroll() {
        let (_, config) = rewrite("Texture2D<float4> layers[4] : register(t0);");
        assert!(config.unroll);

        let (_, config) = rewrite("RWTexture3D<float> volumes[2] : register(u0, space1);");
        assert!(config.unroll);

        let (_, config) = rewrite("Texture2D<float4> single : register(t0);\nfloat weights[4];");
        assert!(!config.unroll);
    }

    #[test]
    fn untouched_source_is_identical() {
        let src = "float4 main(float2 uv : TEXCOORD0) : COLOR { return uv.xyxy; }";
        let (out, config) = rewrite(src);
        assert_eq!(out, src);
        assert!(!config.unroll);
    }
}
