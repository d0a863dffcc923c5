//! Requests and results exchanged between the dispatcher and its backends.

use std::path::PathBuf;

use altinashader_common::{
    OptimizationLevel, ShaderDefine, ShaderStage, SourceLanguage, TargetBackend,
};
use altinashader_permute::PermutationId;
use altinashader_reflect::{ShaderBindingLayout, ShaderReflection};

/// Register shifts applied per descriptor space when HLSL register
/// assignments are cross-compiled to SPIR-V descriptor bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulkanBindingOptions {
    pub enable_auto_shift: bool,
    /// Space the shifts apply to when no auto-binding spaces were recorded.
    pub space: u32,
    pub constant_buffer_shift: u32,
    pub texture_shift: u32,
    pub sampler_shift: u32,
    pub storage_shift: u32,
}

impl Default for VulkanBindingOptions {
    fn default() -> Self {
        Self {
            enable_auto_shift: true,
            space: 0,
            constant_buffer_shift: 0,
            texture_shift: 1000,
            sampler_shift: 2000,
            storage_shift: 3000,
        }
    }
}

/// One shader source file and how to interpret it.
#[derive(Debug, Clone, Default)]
pub struct ShaderSource {
    pub path: PathBuf,
    /// Entry point name; empty lets the compiler pick its default.
    pub entry_point: String,
    pub stage: ShaderStage,
    pub language: SourceLanguage,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<ShaderDefine>,
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub target_backend: TargetBackend,
    pub optimization: OptimizationLevel,
    pub debug_info: bool,
    pub vulkan_binding: VulkanBindingOptions,
    /// Overrides the stage-derived default profile when set.
    pub target_profile: Option<String>,
    /// Overrides the backend's default executable name when set.
    pub compiler_path_override: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    pub source: ShaderSource,
    pub options: CompileOptions,
    pub permutation_id: PermutationId,
}

/// Outcome of one compile. `succeeded` gates the payload fields;
/// `diagnostics` accumulates compiler output, warnings, and fallback
/// notes in the order they happened and is only ever appended to.
#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    pub succeeded: bool,
    pub bytecode: Vec<u8>,
    pub stage: ShaderStage,
    pub reflection: ShaderReflection,
    pub rhi_layout: ShaderBindingLayout,
    pub diagnostics: String,
    /// Path of the bytecode artifact kept on disk for debugging.
    pub output_debug_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulkan_binding_defaults_follow_register_class_ranges() {
        let options = VulkanBindingOptions::default();
        assert!(options.enable_auto_shift);
        assert_eq!(options.space, 0);
        assert_eq!(options.constant_buffer_shift, 0);
        assert_eq!(options.texture_shift, 1000);
        assert_eq!(options.sampler_shift, 2000);
        assert_eq!(options.storage_shift, 3000);
    }

    #[test]
    fn default_result_is_failed_and_empty() {
        let result = CompileResult::default();
        assert!(!result.succeeded);
        assert!(result.bytecode.is_empty());
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.output_debug_path, None);
        assert_eq!(result.reflection.thread_group_size, [1, 1, 1]);
    }

    #[test]
    fn default_request_targets_hlsl_vertex() {
        let request = CompileRequest::default();
        assert_eq!(request.source.stage, ShaderStage::Vertex);
        assert_eq!(request.source.language, SourceLanguage::Hlsl);
        assert_eq!(request.options.target_backend, TargetBackend::Unknown);
        assert_eq!(request.options.optimization, OptimizationLevel::Default);
        assert!(!request.options.debug_info);
    }
}
