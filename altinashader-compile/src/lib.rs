//! External compiler dispatch for Altina shader sources.
//!
//! Requests are routed to `dxc` or `slangc` subprocesses after the
//! auto-binding rewrite, and the tool output is normalized into one
//! [`CompileResult`] carrying bytecode, reflection, and the derived
//! RHI binding layout.

mod args;
mod diag;
mod dispatch;
mod dxc;
mod process;
mod slang;
mod types;

pub use dispatch::{select_backend, shader_compiler, BackendKind, ShaderCompiler};
pub use types::{
    CompileOptions, CompileRequest, CompileResult, ShaderSource, VulkanBindingOptions,
};
