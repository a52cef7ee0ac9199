//! Error types for module registration.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a manager can refuse to register a location.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Module location does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("Not an executable file: {path}")]
    NotExecutable { path: PathBuf },

    #[error("Module {path} rejected: {reason}")]
    Rejected { path: PathBuf, reason: String },

    #[error("I/O error while registering {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
