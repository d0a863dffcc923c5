//! DXC backend, driving `dxc` to produce DXIL, DXBC, or SPIR-V.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use altinashader_common::{temp, TargetBackend};
use altinashader_preprocess::{apply_auto_bindings, RewriteOutput};
use altinashader_reflect::build_binding_layout;

use crate::args;
use crate::diag::append_diagnostic;
use crate::process::{probe_executable, run_process};
use crate::types::{CompileOptions, CompileRequest, CompileResult};

pub(crate) const DISPLAY_NAME: &str = "DXC";

const VERSION_FLAG: &str = "--version";
const UNAVAILABLE_MESSAGE: &str =
    "DXC backend unavailable. Install dxc or set the compiler path override.";

fn default_executable() -> &'static str {
    if cfg!(windows) {
        "dxc.exe"
    } else {
        "dxc"
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

/// Full argv for one `dxc` invocation. The Vulkan register shifts
/// trail the source path; dxc accepts options in any position.
pub(crate) fn compiler_args(
    request: &CompileRequest,
    source_path: &Path,
    output_path: &Path,
    auto_spaces: &[u32],
) -> Vec<OsString> {
    let source = &request.source;
    let options = &request.options;
    let mut argv: Vec<OsString> = Vec::new();

    if !source.entry_point.is_empty() {
        argv.push("-E".into());
        argv.push(source.entry_point.clone().into());
    }

    argv.push("-T".into());
    let profile = options
        .target_profile
        .clone()
        .unwrap_or_else(|| args::default_profile(source.stage, options.target_backend));
    argv.push(profile.into());

    argv.push("-Fo".into());
    argv.push(output_path.into());

    if options.debug_info {
        argv.push("-Zi".into());
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

    if options.target_backend == TargetBackend::Vulkan {
        argv.push("-spirv".into());
        argv.push("-fspv-reflect".into());
    }

    argv.push(source_path.into());

    if options.target_backend == TargetBackend::Vulkan {
        args::append_vulkan_binding_args(&options.vulkan_binding, auto_spaces, &mut argv);
    }
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
        "dxc",
        args::output_extension(request.options.target_backend),
    );
    let auto_spaces =
        args::auto_binding_spaces(rewrite.applied, &rewrite.layout, request.options.target_backend);
    let argv = compiler_args(request, &rewrite.source_path, &output_path, &auto_spaces);

    let run = run_process(&compiler_path, &argv);
    append_diagnostic(&mut result.diagnostics, &run.output);
    if !run.succeeded {
        tracing::debug!("dxc exited with status {:?}", run.exit_code);
        temp::remove_artifact(&output_path);
        discard_rewrite(&rewrite);
        return result;
    }

    match fs::read(&output_path) {
        Ok(bytes) => result.bytecode = bytes,
        Err(_) => {
            append_diagnostic(&mut result.diagnostics, "Failed to read DXC output file.");
            temp::remove_artifact(&output_path);
            discard_rewrite(&rewrite);
            return result;
        }
    }

    result.output_debug_path = Some(output_path);
    result.succeeded = true;

    extract_reflection(&mut result, request.options.target_backend);
    result.rhi_layout = build_binding_layout(&result.reflection, result.stage);
    discard_rewrite(&rewrite);
    result
}

fn discard_rewrite(rewrite: &RewriteOutput) {
    if rewrite.applied {
        temp::remove_artifact(&rewrite.source_path);
    }
}

#[cfg(windows)]
fn extract_reflection(result: &mut CompileResult, target: TargetBackend) {
    if target == TargetBackend::Vulkan {
        append_diagnostic(
            &mut result.diagnostics,
            "DXC reflection for SPIR-V output is not implemented; prefer Slang for Vulkan.",
        );
        return;
    }
    match altinashader_reflect::reflect_dxil(&result.bytecode) {
        Ok(reflection) => result.reflection = reflection,
        Err(error) => {
            append_diagnostic(&mut result.diagnostics, &format!("DXC reflection: {error}."));
            append_diagnostic(
                &mut result.diagnostics,
                "DXC reflection extraction failed; reflection data may be incomplete.",
            );
        }
    }
}

#[cfg(not(windows))]
fn extract_reflection(result: &mut CompileResult, _target: TargetBackend) {
    append_diagnostic(
        &mut result.diagnostics,
        "DXC reflection extraction not supported on this platform.",
    );
}

#[cfg(test)]
mod tests {
    use altinashader_common::{OptimizationLevel, ShaderDefine, ShaderStage};
    use altinashader_permute::PermutationId;

    use crate::args::args_as_strings;
    use crate::types::ShaderSource;

    use super::*;

    fn pixel_request(target: TargetBackend) -> CompileRequest {
        CompileRequest {
            source: ShaderSource {
                path: PathBuf::from("shaders/lit.hlsl"),
                entry_point: String::from("MainPS"),
                stage: ShaderStage::Pixel,
                ..ShaderSource::default()
            },
            options: CompileOptions {
                target_backend: target,
                ..CompileOptions::default()
            },
            permutation_id: PermutationId(0),
        }
    }

    #[test]
    fn argv_for_dx12_orders_entry_profile_and_output() {
        let mut request = pixel_request(TargetBackend::Dx12);
        request.options.debug_info = true;
        request.source.include_dirs.push(PathBuf::from("shaders/include"));
        request.source.defines.push(ShaderDefine::new("AE_LIGHTS", "4"));
        let argv = compiler_args(
            &request,
            Path::new("shaders/lit.hlsl"),
            Path::new("out/lit.dxil"),
            &[],
        );
        assert_eq!(
            args_as_strings(&argv),
            vec![
                "-E", "MainPS",
                "-T", "ps_6_6",
                "-Fo", "out/lit.dxil",
                "-Zi",
                "-O1",
                "-I", "shaders/include",
                "-D", "AE_LIGHTS=4",
                "shaders/lit.hlsl",
            ]
        );
    }

    #[test]
    fn argv_omits_entry_when_unset_and_honors_profile_override() {
        let mut request = pixel_request(TargetBackend::Dx11);
        request.source.entry_point.clear();
        request.options.target_profile = Some(String::from("ps_6_7"));
        request.options.optimization = OptimizationLevel::Performance;
        let argv = compiler_args(
            &request,
            Path::new("shaders/lit.hlsl"),
            Path::new("out/lit.dxbc"),
            &[],
        );
        assert_eq!(
            args_as_strings(&argv),
            vec!["-T", "ps_6_7", "-Fo", "out/lit.dxbc", "-O3", "shaders/lit.hlsl"]
        );
    }

    #[test]
    fn argv_for_vulkan_appends_spirv_flags_and_shifts_after_source() {
        let request = pixel_request(TargetBackend::Vulkan);
        let argv = compiler_args(
            &request,
            Path::new("shaders/lit.hlsl"),
            Path::new("out/lit.spv"),
            &[1],
        );
        let strings = args_as_strings(&argv);
        let source_at = strings.iter().position(|arg| arg == "shaders/lit.hlsl").unwrap();
        let spirv_at = strings.iter().position(|arg| arg == "-spirv").unwrap();
        assert!(strings.contains(&String::from("-fspv-reflect")));
        assert!(spirv_at < source_at);
        assert_eq!(
            &strings[source_at + 1..],
            [
                "-fvk-b-shift", "0", "1",
                "-fvk-t-shift", "1000", "1",
                "-fvk-s-shift", "2000", "1",
                "-fvk-u-shift", "3000", "1",
            ]
        );
    }

    #[test]
    fn unavailable_compiler_fails_with_guidance() {
        let mut request = pixel_request(TargetBackend::Dx12);
        request.options.compiler_path_override =
            Some(PathBuf::from("altinashader-no-such-compiler"));
        let result = compile(&request);
        assert!(!result.succeeded);
        assert_eq!(result.diagnostics, UNAVAILABLE_MESSAGE);
        assert_eq!(result.stage, ShaderStage::Pixel);
    }

    #[cfg(unix)]
    mod fake_compiler {
        use std::os::unix::fs::PermissionsExt;

        use tempfile::TempDir;

        use super::*;

        fn write_tool(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-dxc.sh");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn write_source(dir: &TempDir, text: &str) -> PathBuf {
            let path = dir.path().join("lit.hlsl");
            fs::write(&path, text).unwrap();
            path
        }

        const WRITES_OUTPUT: &str = r#"out=
prev=
for arg in "$@"; do
  if [ "$prev" = "-Fo" ]; then out="$arg"; fi
  prev="$arg"
done
if [ -n "$out" ]; then printf 'BYTECODE' > "$out"; fi
echo fake dxc ran"#;

        #[test]
        fn successful_run_reads_bytecode_and_keeps_debug_path() {
            let dir = TempDir::new().unwrap();
            let mut request = pixel_request(TargetBackend::Dx12);
            request.source.path = write_source(&dir, "float4 MainPS() : SV_Target { return 0; }");
            request.options.compiler_path_override = Some(write_tool(&dir, WRITES_OUTPUT));

            let result = compile(&request);
            assert!(result.succeeded);
            assert_eq!(result.bytecode, b"BYTECODE");
            let debug_path = result.output_debug_path.unwrap();
            assert!(debug_path.exists());
            assert!(result.diagnostics.starts_with("fake dxc ran"));
            assert!(result
                .diagnostics
                .contains("DXC reflection extraction not supported on this platform."));
            temp::remove_artifact(&debug_path);
        }

        #[test]
        fn failing_run_carries_tool_output_and_fails() {
            let dir = TempDir::new().unwrap();
            let mut request = pixel_request(TargetBackend::Dx12);
            request.source.path = write_source(&dir, "float4 MainPS() { return 0; }");
            request.options.compiler_path_override =
                Some(write_tool(&dir, "echo error: bad shader 1>&2\nexit 1"));

            let result = compile(&request);
            assert!(!result.succeeded);
            assert!(result.bytecode.is_empty());
            assert_eq!(result.output_debug_path, None);
            assert!(result.diagnostics.contains("error: bad shader"));
        }

        #[test]
        fn missing_output_file_reports_read_failure() {
            let dir = TempDir::new().unwrap();
            let mut request = pixel_request(TargetBackend::Dx12);
            request.source.path = write_source(&dir, "float4 MainPS() { return 0; }");
            request.options.compiler_path_override =
                Some(write_tool(&dir, "echo pretended ok"));

            let result = compile(&request);
            assert!(!result.succeeded);
            assert_eq!(
                result.diagnostics,
                "pretended ok\nFailed to read DXC output file."
            );
        }

        #[test]
        fn marker_source_is_rewritten_before_the_tool_sees_it() {
            let dir = TempDir::new().unwrap();
            let mut request = pixel_request(TargetBackend::Dx12);
            request.source.path = write_source(
                &dir,
                "AE_PER_DRAW_SRV(Texture2D, Albedo)\nfloat4 MainPS() { return 0; }\n",
            );
            // The tool echoes back the source path it was handed.
            let body = r#"prev=
src=
for arg in "$@"; do prev="$arg"; done
src="$prev"
out=
prev=
for arg in "$@"; do
  if [ "$prev" = "-Fo" ]; then out="$arg"; fi
  prev="$arg"
done
printf 'B' > "$out"
echo "compiled $src""#;
            request.options.compiler_path_override = Some(write_tool(&dir, body));

            let result = compile(&request);
            assert!(result.succeeded);
            let echoed = result
                .diagnostics
                .lines()
                .find(|line| line.starts_with("compiled "))
                .unwrap();
            assert!(echoed.contains("autobind"));
            assert_ne!(echoed, format!("compiled {}", request.source.path.display()));
            let debug_path = result.output_debug_path.unwrap();
            temp::remove_artifact(&debug_path);
        }
    }
}
