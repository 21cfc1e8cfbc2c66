//! Shader pipeline stages and source languages.

use std::fmt;
use std::str::FromStr;

/// Programmable pipeline stage a cached program was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    TessellationControl,
    TessellationEvaluation,
    Compute,
}

impl ShaderStage {
    /// Every stage, in pipeline order.
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::TessellationControl,
        ShaderStage::TessellationEvaluation,
        ShaderStage::Compute,
    ];

    /// Lower-case stage name used in logs and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::TessellationControl => "tess-control",
            Self::TessellationEvaluation => "tess-evaluation",
            Self::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShaderStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertex" | "vert" | "vs" => Ok(Self::Vertex),
            "fragment" | "frag" | "ps" => Ok(Self::Fragment),
            "tess-control" | "tesc" => Ok(Self::TessellationControl),
            "tess-evaluation" | "tese" => Ok(Self::TessellationEvaluation),
            "compute" | "comp" | "cs" => Ok(Self::Compute),
            other => Err(format!("unknown shader stage '{other}'")),
        }
    }
}

/// Language the engine compiled a program from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderLanguage {
    #[default]
    Glsl,
    Hlsl,
}

impl ShaderLanguage {
    /// Extension of the debug side file holding the original source.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Glsl => "glsl",
            Self::Hlsl => "hlsl",
        }
    }
}
