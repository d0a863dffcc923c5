//! Backend selection, fallback policy, and the public compile entry points.

use once_cell::sync::Lazy;

use altinashader_common::{SourceLanguage, TargetBackend};

use crate::diag::append_diagnostic;
use crate::types::{CompileOptions, CompileRequest, CompileResult};
use crate::{dxc, slang};

/// The two external compiler backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Dxc,
    Slang,
}

impl BackendKind {
    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Dxc => dxc::DISPLAY_NAME,
            BackendKind::Slang => slang::DISPLAY_NAME,
        }
    }

    /// Whether the backend's executable can currently be spawned.
    pub fn is_available(self, options: &CompileOptions) -> bool {
        match self {
            BackendKind::Dxc => dxc::is_available(options),
            BackendKind::Slang => slang::is_available(options),
        }
    }

    fn run(self, request: &CompileRequest) -> CompileResult {
        match self {
            BackendKind::Dxc => dxc::compile(request),
            BackendKind::Slang => slang::compile(request),
        }
    }
}

/// Preferred and fallback backend for a target and source language.
/// Slang leads for Vulkan targets and for Slang sources, DXC otherwise.
pub fn select_backend(
    target: TargetBackend,
    language: SourceLanguage,
) -> (BackendKind, BackendKind) {
    if target == TargetBackend::Vulkan || language == SourceLanguage::Slang {
        (BackendKind::Slang, BackendKind::Dxc)
    } else {
        (BackendKind::Dxc, BackendKind::Slang)
    }
}

/// Applies the fallback policy to the probed availabilities. Notes about
/// a fallback or a dead end are appended to `notes` for the caller to
/// attach after the compile output.
fn resolve_backend(
    primary: BackendKind,
    fallback: BackendKind,
    primary_available: bool,
    fallback_available: bool,
    notes: &mut String,
) -> Option<BackendKind> {
    if primary_available {
        return Some(primary);
    }
    if fallback_available {
        append_diagnostic(
            notes,
            "Preferred shader compiler backend unavailable; using fallback.",
        );
        return Some(fallback);
    }

    append_diagnostic(notes, "No shader compiler backend available.");
    let (dxc_available, slang_available) = if primary == BackendKind::Dxc {
        (primary_available, fallback_available)
    } else {
        (fallback_available, primary_available)
    };
    for (backend, available) in [
        (BackendKind::Dxc, dxc_available),
        (BackendKind::Slang, slang_available),
    ] {
        let status = if available { "available" } else { "disabled" };
        append_diagnostic(notes, &format!("{}: {status}", backend.display_name()));
    }
    None
}

/// Stateless dispatcher over the two backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderCompiler;

impl ShaderCompiler {
    /// Selects a backend for the request and runs it. Selection notes
    /// land in the result diagnostics after the backend's own output.
    pub fn compile(&self, request: &CompileRequest) -> CompileResult {
        let (primary, fallback) =
            select_backend(request.options.target_backend, request.source.language);
        let mut notes = String::new();
        let Some(backend) = resolve_backend(
            primary,
            fallback,
            primary.is_available(&request.options),
            fallback.is_available(&request.options),
            &mut notes,
        ) else {
            return CompileResult {
                stage: request.source.stage,
                diagnostics: notes,
                ..CompileResult::default()
            };
        };

        let mut result = backend.run(request);
        append_diagnostic(&mut result.diagnostics, &notes);
        result
    }

    /// Runs [`compile`](Self::compile) and hands the result to the
    /// callback. Compilation happens on the calling thread.
    pub fn compile_async<F>(&self, request: &CompileRequest, on_completed: F)
    where
        F: FnOnce(CompileResult),
    {
        on_completed(self.compile(request));
    }
}

static SHADER_COMPILER: Lazy<ShaderCompiler> = Lazy::new(ShaderCompiler::default);

/// Process-wide dispatcher instance.
pub fn shader_compiler() -> &'static ShaderCompiler {
    &SHADER_COMPILER
}
