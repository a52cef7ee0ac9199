//! Executable discovery inside a single directory.
//!
//! Only direct children are considered. A directory that cannot be read
//! (missing, permission denied, removed mid-scan) yields no executables.

use std::fs;
use std::path::{Path, PathBuf};

/// List the executable regular files directly inside `dir`.
///
/// Returned paths are `dir` joined with each entry name, sorted.
pub fn executables_in(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            crate::debug_event!("scanner", "unreadable", "{}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut executables: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_executable(path))
        .collect();

    executables.sort();
    executables
}

/// Check whether `path` is a regular file the current platform treats as executable.
///
/// Symlinks are followed. On unix this checks the mode bits only: any of
/// the owner, group or other execute bits counts, whoever the current user is.
pub fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && has_execute_permission(path, &meta),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn has_execute_permission(_path: &Path, meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_permission(path: &Path, _meta: &fs::Metadata) -> bool {
    const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com"];
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            EXECUTABLE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
