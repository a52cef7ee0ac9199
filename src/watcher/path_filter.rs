//! Validation and canonicalization of candidate directory paths.

use std::path::{Path, PathBuf};

/// Keep the candidates that name an existing directory, canonicalized.
///
/// Blank entries, missing paths and non-directories are dropped without
/// error. Input order is preserved; duplicates are not removed here.
pub fn filter_directories<I, P>(candidates: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    candidates
        .into_iter()
        .filter_map(valid_directory)
        .collect()
}

/// Canonical form of `candidate` if it is a usable directory.
pub fn valid_directory(candidate: impl AsRef<Path>) -> Option<PathBuf> {
    let candidate = candidate.as_ref();
    if candidate.as_os_str().to_string_lossy().trim().is_empty() {
        return None;
    }

    match std::fs::canonicalize(candidate) {
        Ok(path) if path.is_dir() => Some(path),
        Ok(path) => {
            crate::debug_event!("filter", "not a directory", "{}", path.display());
            None
        }
        Err(e) => {
            crate::debug_event!("filter", "dropped", "{}: {e}", candidate.display());
            None
        }
    }
}
