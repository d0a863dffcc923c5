#![forbid(missing_docs)]
//! Shader permutation and binding toolchain for the Altina engine.
//!
//! altinashader turns annotated HLSL or Slang sources into compiled shader
//! permutations. Sources declare their permutation dimensions, builtin
//! flags, validity rules, and raster state in `@altina` comment blocks;
//! resource declarations use auto-binding markers instead of hand-assigned
//! registers.
//!
//! ## Usage
//! The usual flow parses a [`ShaderDsl`](crate::permute::ShaderDsl) from the
//! source, expands its multi-value dimensions into concrete assignments,
//! keeps the ones the rule set accepts, and submits one
//! [`CompileRequest`](crate::compile::CompileRequest) per assignment through
//! [`shader_compiler`](crate::compile::shader_compiler). Each result carries
//! bytecode, normalized reflection, and an RHI binding layout.
//!
//! ## Backends
//! Compilation shells out to an external compiler; the dispatcher prefers
//! Slang for Vulkan targets and Slang sources, DXC otherwise.
//!
//! | **Backend** | **Outputs**        | **Reflection**            |
//! |-------------|--------------------|---------------------------|
//! | DXC         | DXIL, DXBC, SPIR-V | DXIL containers (Windows) |
//! | Slang       | DXIL, DXBC, SPIR-V | JSON side-files           |

/// Parsing and expansion of `@altina` permutation annotations.
///
/// Annotation blocks declare permutation dimensions and builtin flags,
/// rules constraining valid combinations, and an optional raster state.
/// Each surviving combination gets a stable 64-bit identity.
pub mod permute {
    use altinashader_common::ShaderDefine;
    pub use altinashader_permute::*;

    /// Renders the full define list for one permutation choice, using the
    /// standard `AE_PERM_` and `AE_BUILTIN_` name prefixes.
    pub fn permutation_defines(
        dsl: &ShaderDsl,
        values: &PermutationValues,
        builtins: Option<&BuiltinValues>,
    ) -> Vec<ShaderDefine> {
        let mut defines = dsl.permutations.defines(values, PERMUTATION_DEFINE_PREFIX);
        if let Some(builtin_values) = builtins {
            defines.extend(dsl.builtins.defines(builtin_values, BUILTIN_NAME_PREFIX));
        }
        defines
    }
}

/// Auto-binding register assignment for shader sources.
///
/// `AE_PER_<GROUP>_<KIND>` markers are rewritten into concrete
/// `register(...)` declarations before the external compiler runs.
pub mod preprocess {
    pub use altinashader_preprocess::*;
}

/// Shader reflection and RHI binding layouts.
pub mod reflect {
    pub use altinashader_reflect::*;
}

/// External compiler dispatch.
pub mod compile {
    pub use altinashader_compile::*;
}

pub use altinashader_common::{
    OptimizationLevel, ShaderDefine, ShaderStage, SourceLanguage, TargetBackend,
};
