//! Error taxonomy for vault operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Vault-specific errors
///
/// Every variant names the failure kind and, where one exists, the
/// offending path or line. Key material never appears in a message.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Key file is not a valid identity: {}: {reason}", path.display())]
    KeyFormat { path: PathBuf, reason: String },

    #[error("Key file was just created by another process: {} - re-run to use it", path.display())]
    KeyConflict { path: PathBuf },

    #[error("Cannot decrypt {}: wrong key or corrupted vault", path.display())]
    Decryption { path: PathBuf },

    #[error("Malformed document at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
