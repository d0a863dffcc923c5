//! Types shared across the altinashader toolchain.

pub mod temp;

use std::fmt;

/// Pipeline stage a shader entry point is compiled for.
#[repr(u32)]
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    #[default]
    Vertex = 0,
    Pixel,
    Compute,
    Geometry,
    Hull,
    Domain,
    Mesh,
    Amplification,
    Library,
}

impl ShaderStage {
    /// Stable numeric identity, folded into permutation fingerprints.
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Graphics API the compiled shader will be bound through.
#[repr(u32)]
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TargetBackend {
    #[default]
    Unknown = 0,
    Dx12,
    Vulkan,
    Dx11,
    OpenGl,
    Metal,
}

impl TargetBackend {
    /// Dx11 addresses resources through flat per-kind register ranges;
    /// every other backend takes `register(xN, spaceM)` declarations.
    pub fn uses_register_spaces(self) -> bool {
        !matches!(self, TargetBackend::Dx11)
    }
}

/// Source language a shader is authored in.
#[repr(u32)]
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SourceLanguage {
    #[default]
    Hlsl = 0,
    Slang,
}

/// Optimization requested from the external compiler.
#[repr(u32)]
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OptimizationLevel {
    Debug = 0,
    #[default]
    Default,
    Performance,
    Size,
}

/// Preprocessor define handed to the external compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDefine {
    pub name: String,
    pub value: Option<String>,
}

impl ShaderDefine {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ShaderDefine {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// A bare define with no value, `-D NAME`.
    pub fn flag(name: impl Into<String>) -> Self {
        ShaderDefine {
            name: name.into(),
            value: None,
        }
    }
}

impl fmt::Display for ShaderDefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}
