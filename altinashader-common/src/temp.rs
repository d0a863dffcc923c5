//! Process-unique paths for intermediate compile artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARTIFACT_ID: AtomicU32 = AtomicU32::new(0);

/// Directory all intermediate artifacts land in.
pub fn artifact_dir() -> PathBuf {
    std::env::temp_dir().join("altinashader").join("shader-compile")
}

/// Reserve a unique path for an intermediate artifact derived from
/// `source_path`, named `<stem>_<id>_<suffix>.<extension>`.
///
/// The id comes from one process-wide atomic counter, so concurrent
/// compiles sharing a process never collide. Callers are expected to
/// delete the file best-effort once it has been consumed; a crash
/// between write and cleanup leaks it.
pub fn alloc_artifact_path(source_path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let dir = artifact_dir();
    let _ = fs::create_dir_all(&dir);

    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("shader");
    let id = NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{stem}_{id}_{suffix}.{extension}"))
}

/// Best-effort delete for intermediate artifacts.
pub fn remove_artifact(path: &Path) {
    let _ = fs::remove_file(path);
}
