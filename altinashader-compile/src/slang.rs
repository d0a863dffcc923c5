//! Slang backend, driving `slangc` with JSON reflection side-files.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use altinashader_common::{temp, ShaderStage, SourceLanguage, TargetBackend};
use altinashader_preprocess::{apply_auto_bindings, RewriteOutput};
use altinashader_reflect::{build_binding_layout, reflection_from_json};

use crate::args;
use crate::diag::append_diagnostic;
use crate::process::{probe_executable, run_process};
use crate::types::{CompileOptions, CompileRequest, CompileResult};

pub(crate) const DISPLAY_NAME: &str = "Slang";

const VERSION_FLAG: &str = "-v";
const UNAVAILABLE_MESSAGE: &str =
    "Slang backend unavailable. Install slangc or set the compiler path override.";

fn default_executable() -> &'static str {
    if cfg!(windows) {
        "slangc.exe"
    } else {
        "slangc"
    }
}

pub(crate) fn executable_path(options: &CompileOptions) -> PathBuf {
    options
        .compiler_path_override
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_executable()))
}

pub(crate) fn is_available(options: &CompileOptions) -> bool {
    probe_executable(&executable_path(options), VERSION_FLAG)
}

fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Pixel => "fragment",
        ShaderStage::Compute => "compute",
        ShaderStage::Geometry => "geometry",
        ShaderStage::Hull => "hull",
        ShaderStage::Domain => "domain",
        ShaderStage::Mesh => "mesh",
        ShaderStage::Amplification => "amplification",
        ShaderStage::Library => "library",
    }
}

fn target_name(target: TargetBackend) -> &'static str {
    match target {
        TargetBackend::Dx11 => "dxbc",
        TargetBackend::Vulkan => "spirv",
        _ => "dxil",
    }
}

fn language_flag(language: SourceLanguage) -> &'static str {
    match language {
        SourceLanguage::Slang => "slang",
        SourceLanguage::Hlsl => "hlsl",
    }
}

/// Full argv for one `slangc` invocation. Unlike dxc the Vulkan
/// register shifts precede the source path, which stays last.
pub(crate) fn compiler_args(
    request: &CompileRequest,
    source_path: &Path,
    output_path: &Path,
    reflection_path: &Path,
    auto_spaces: &[u32],
) -> Vec<OsString> {
    let source = &request.source;
    let options = &request.options;
    let mut argv: Vec<OsString> = Vec::new();

    argv.push("-lang".into());
    argv.push(language_flag(source.language).into());

    if !source.entry_point.is_empty() {
        argv.push("-entry".into());
        argv.push(source.entry_point.clone().into());
        argv.push("-stage".into());
        argv.push(stage_name(source.stage).into());
    }

    argv.push("-target".into());
    argv.push(target_name(options.target_backend).into());

    argv.push("-profile".into());
    let profile = options
        .target_profile
        .clone()
        .unwrap_or_else(|| args::default_profile(source.stage, options.target_backend));
    argv.push(profile.into());

    if options.debug_info {
        argv.push("-g".into());
    }
    argv.push(args::optimization_flag(options.optimization).into());

    for dir in &source.include_dirs {
        argv.push("-I".into());
        argv.push(dir.into());
    }
    for define in &source.defines {
        argv.push("-D".into());
        argv.push(args::define_argument(define).into());
    }

    argv.push("-o".into());
    argv.push(output_path.into());
    argv.push("-reflection-json".into());
    argv.push(reflection_path.into());

    if options.target_backend == TargetBackend::Vulkan {
        args::append_vulkan_binding_args(&options.vulkan_binding, auto_spaces, &mut argv);
    }

    argv.push(source_path.into());
    argv
}

pub(crate) fn compile(request: &CompileRequest) -> CompileResult {
    let mut result = CompileResult {
        stage: request.source.stage,
        ..CompileResult::default()
    };

    let compiler_path = executable_path(&request.options);
    if !probe_executable(&compiler_path, VERSION_FLAG) {
        append_diagnostic(&mut result.diagnostics, UNAVAILABLE_MESSAGE);
        return result;
    }

    let rewrite = match apply_auto_bindings(&request.source.path, request.options.target_backend) {
        Ok(rewrite) => rewrite,
        Err(error) => {
            append_diagnostic(&mut result.diagnostics, &format!("AutoBinding: {error}."));
            return result;
        }
    };
    for warning in &rewrite.warnings {
        append_diagnostic(&mut result.diagnostics, warning);
    }

    let output_path = temp::alloc_artifact_path(
        &rewrite.source_path,
        "slang",
        args::output_extension(request.options.target_backend),
    );
    let reflection_path = temp::alloc_artifact_path(&rewrite.source_path, "slang", "json");
    let auto_spaces =
        args::auto_binding_spaces(rewrite.applied, &rewrite.layout, request.options.target_backend);
    let argv = compiler_args(
        request,
        &rewrite.source_path,
        &output_path,
        &reflection_path,
        &auto_spaces,
    );

    let run = run_process(&compiler_path, &argv);
    append_diagnostic(&mut result.diagnostics, &run.output);
    if !run.succeeded {
        tracing::debug!("slangc exited with status {:?}", run.exit_code);
        temp::remove_artifact(&output_path);
        temp::remove_artifact(&reflection_path);
        discard_rewrite(&rewrite);
        return result;
    }

    match fs::read(&output_path) {
        Ok(bytes) => result.bytecode = bytes,
        Err(_) => {
            append_diagnostic(&mut result.diagnostics, "Failed to read Slang output file.");
            temp::remove_artifact(&output_path);
            temp::remove_artifact(&reflection_path);
            discard_rewrite(&rewrite);
            return result;
        }
    }

    // A missing side-file degrades to a note since the bytecode is
    // usable, but a side-file the reader rejects fails the compile.
    match fs::read_to_string(&reflection_path) {
        Ok(json) => match reflection_from_json(&json) {
            Ok(reflection) => result.reflection = reflection,
            Err(error) => {
                tracing::debug!("slang reflection rejected: {error}");
                append_diagnostic(
                    &mut result.diagnostics,
                    "Failed to parse Slang reflection JSON.",
                );
                result.bytecode = Vec::new();
                temp::remove_artifact(&output_path);
                temp::remove_artifact(&reflection_path);
                discard_rewrite(&rewrite);
                return result;
            }
        },
        Err(_) => {
            append_diagnostic(&mut result.diagnostics, "Failed to read Slang reflection JSON.");
        }
    }
    temp::remove_artifact(&reflection_path);

    result.output_debug_path = Some(output_path);
    result.succeeded = true;
    result.rhi_layout = build_binding_layout(&result.reflection, result.stage);
    discard_rewrite(&rewrite);
    result
}

fn discard_rewrite(rewrite: &RewriteOutput) {
    if rewrite.applied {
        temp::remove_artifact(&rewrite.source_path);
    }
}
