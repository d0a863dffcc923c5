//! Argument fragments shared by both compiler backends.

use std::ffi::OsString;

use altinashader_common::{OptimizationLevel, ShaderDefine, ShaderStage, TargetBackend};
use altinashader_preprocess::{AutoBindingLayout, BindingGroup};

use crate::types::VulkanBindingOptions;

pub(crate) fn stage_profile_prefix(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vs",
        ShaderStage::Pixel => "ps",
        ShaderStage::Compute => "cs",
        ShaderStage::Geometry => "gs",
        ShaderStage::Hull => "hs",
        ShaderStage::Domain => "ds",
        ShaderStage::Mesh => "ms",
        ShaderStage::Amplification => "as",
        ShaderStage::Library => "lib",
    }
}

/// Shader model 5.0 for DXBC targets, 6.6 everywhere else.
pub(crate) fn default_profile(stage: ShaderStage, target: TargetBackend) -> String {
    let model = if target == TargetBackend::Dx11 { "5_0" } else { "6_6" };
    format!("{}_{model}", stage_profile_prefix(stage))
}

pub(crate) fn output_extension(target: TargetBackend) -> &'static str {
    match target {
        TargetBackend::Vulkan => "spv",
        TargetBackend::Dx11 => "dxbc",
        _ => "dxil",
    }
}

pub(crate) fn optimization_flag(level: OptimizationLevel) -> &'static str {
    match level {
        OptimizationLevel::Debug => "-O0",
        OptimizationLevel::Performance => "-O3",
        OptimizationLevel::Size => "-O2",
        OptimizationLevel::Default => "-O1",
    }
}

/// `-D` payload; a define with no value (or an empty one) is the bare name.
pub(crate) fn define_argument(define: &ShaderDefine) -> String {
    match &define.value {
        Some(value) if !value.is_empty() => format!("{}={value}", define.name),
        _ => define.name.clone(),
    }
}

/// Descriptor spaces that received auto-assigned registers, in group
/// order. Empty when the rewrite did not run or the target keeps native
/// register numbering.
pub(crate) fn auto_binding_spaces(
    applied: bool,
    layout: &AutoBindingLayout,
    target: TargetBackend,
) -> Vec<u32> {
    if !applied || target != TargetBackend::Vulkan {
        return Vec::new();
    }
    BindingGroup::ALL
        .iter()
        .filter(|group| layout.group_used(**group))
        .map(|group| group.index() as u32)
        .collect()
}

/// `-fvk-*-shift` triples for every space that needs remapping. With no
/// recorded auto-binding spaces the configured fallback space is shifted.
pub(crate) fn append_vulkan_binding_args(
    options: &VulkanBindingOptions,
    spaces: &[u32],
    args: &mut Vec<OsString>,
) {
    if !options.enable_auto_shift {
        return;
    }

    let shifts = [
        ("-fvk-b-shift", options.constant_buffer_shift),
        ("-fvk-t-shift", options.texture_shift),
        ("-fvk-s-shift", options.sampler_shift),
        ("-fvk-u-shift", options.storage_shift),
    ];
    let mut append_for_space = |space: u32| {
        for (flag, shift) in shifts {
            args.push(flag.into());
            args.push(shift.to_string().into());
            args.push(space.to_string().into());
        }
    };

    if spaces.is_empty() {
        append_for_space(options.space);
    } else {
        for &space in spaces {
            append_for_space(space);
        }
    }
}

#[cfg(test)]
pub(crate) fn args_as_strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use altinashader_preprocess::rewrite_source;

    use super::*;

    #[test]
    fn profile_prefix_covers_every_stage() {
        assert_eq!(stage_profile_prefix(ShaderStage::Vertex), "vs");
        assert_eq!(stage_profile_prefix(ShaderStage::Pixel), "ps");
        assert_eq!(stage_profile_prefix(ShaderStage::Compute), "cs");
        assert_eq!(stage_profile_prefix(ShaderStage::Geometry), "gs");
        assert_eq!(stage_profile_prefix(ShaderStage::Hull), "hs");
        assert_eq!(stage_profile_prefix(ShaderStage::Domain), "ds");
        assert_eq!(stage_profile_prefix(ShaderStage::Mesh), "ms");
        assert_eq!(stage_profile_prefix(ShaderStage::Amplification), "as");
        assert_eq!(stage_profile_prefix(ShaderStage::Library), "lib");
    }

    #[test]
    fn default_profile_drops_to_sm50_for_dx11() {
        assert_eq!(default_profile(ShaderStage::Pixel, TargetBackend::Dx11), "ps_5_0");
        assert_eq!(default_profile(ShaderStage::Pixel, TargetBackend::Dx12), "ps_6_6");
        assert_eq!(default_profile(ShaderStage::Compute, TargetBackend::Vulkan), "cs_6_6");
    }

    #[test]
    fn output_extension_tracks_target() {
        assert_eq!(output_extension(TargetBackend::Vulkan), "spv");
        assert_eq!(output_extension(TargetBackend::Dx11), "dxbc");
        assert_eq!(output_extension(TargetBackend::Dx12), "dxil");
        assert_eq!(output_extension(TargetBackend::Unknown), "dxil");
    }

    #[test]
    fn optimization_flags_map_each_level() {
        assert_eq!(optimization_flag(OptimizationLevel::Debug), "-O0");
        assert_eq!(optimization_flag(OptimizationLevel::Default), "-O1");
        assert_eq!(optimization_flag(OptimizationLevel::Size), "-O2");
        assert_eq!(optimization_flag(OptimizationLevel::Performance), "-O3");
    }

    #[test]
    fn define_argument_renders_value_only_when_present() {
        assert_eq!(define_argument(&ShaderDefine::flag("AE_FOG")), "AE_FOG");
        assert_eq!(define_argument(&ShaderDefine::new("AE_LIGHTS", "4")), "AE_LIGHTS=4");
        assert_eq!(define_argument(&ShaderDefine::new("AE_EMPTY", "")), "AE_EMPTY");
    }

    #[test]
    fn auto_spaces_list_used_groups_in_order() {
        let rewritten = rewrite_source(
            "AE_PER_FRAME_CBUFFER(Scene)\nAE_PER_MATERIAL_SRV(Texture2D, Albedo)\n",
            TargetBackend::Vulkan,
        );
        assert!(rewritten.applied);
        let spaces = auto_binding_spaces(true, &rewritten.layout, TargetBackend::Vulkan);
        assert_eq!(spaces, vec![0, 2]);
    }

    #[test]
    fn auto_spaces_empty_without_rewrite_or_off_vulkan() {
        let rewritten = rewrite_source("AE_PER_DRAW_SAMPLER(Linear)", TargetBackend::Vulkan);
        assert!(auto_binding_spaces(false, &rewritten.layout, TargetBackend::Vulkan).is_empty());
        assert!(auto_binding_spaces(true, &rewritten.layout, TargetBackend::Dx12).is_empty());
    }

    #[test]
    fn shift_args_cover_the_fallback_space() {
        let options = VulkanBindingOptions::default();
        let mut args = Vec::new();
        append_vulkan_binding_args(&options, &[], &mut args);
        assert_eq!(
            args_as_strings(&args),
            vec![
                "-fvk-b-shift", "0", "0",
                "-fvk-t-shift", "1000", "0",
                "-fvk-s-shift", "2000", "0",
                "-fvk-u-shift", "3000", "0",
            ]
        );
    }

    #[test]
    fn shift_args_repeat_per_recorded_space() {
        let options = VulkanBindingOptions::default();
        let mut args = Vec::new();
        append_vulkan_binding_args(&options, &[0, 2], &mut args);
        assert_eq!(args.len(), 24);
        let strings = args_as_strings(&args);
        assert_eq!(strings[2], "0");
        assert_eq!(strings[14], "2");
    }

    #[test]
    fn shift_args_disabled_emits_nothing() {
        let options = VulkanBindingOptions {
            enable_auto_shift: false,
            ..VulkanBindingOptions::default()
        };
        let mut args = Vec::new();
        append_vulkan_binding_args(&options, &[0], &mut args);
        assert!(args.is_empty());
    }
}
