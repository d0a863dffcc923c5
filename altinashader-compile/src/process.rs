//! Subprocess execution for the external compiler tools.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Captured output of one tool invocation.
#[derive(Debug, Default)]
pub(crate) struct ProcessOutput {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    /// Stdout followed by stderr, in that order.
    pub output: String,
}

/// Runs a compiler executable to completion. A process that cannot be
/// launched reports failure through `output` like a diagnostic rather
/// than through an error type, since callers forward it verbatim.
pub(crate) fn run_process(program: &Path, args: &[OsString]) -> ProcessOutput {
    tracing::debug!("running {} {:?}", program.display(), args);
    match Command::new(program).args(args).output() {
        Ok(done) => {
            let mut text = String::from_utf8_lossy(&done.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&done.stderr);
            if !stderr.is_empty() {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(stderr.trim_end());
            }
            let text = text.trim_end().to_owned();
            ProcessOutput {
                succeeded: done.status.success(),
                exit_code: done.status.code(),
                output: text,
            }
        }
        Err(error) => {
            tracing::debug!("could not launch {}: {error}", program.display());
            ProcessOutput {
                succeeded: false,
                exit_code: None,
                output: String::from("Failed to launch compiler process."),
            }
        }
    }
}

/// A backend is available when its executable can be spawned at all.
/// The exit code is ignored since version flags differ across tool
/// releases.
pub(crate) fn probe_executable(program: &Path, version_flag: &str) -> bool {
    Command::new(program).arg(version_flag).output().is_ok()
}
