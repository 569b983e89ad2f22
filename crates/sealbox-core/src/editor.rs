//! External editor boundary
//!
//! Hands document text to $EDITOR through a temp file inside the private
//! vault directory and reads the result back. The temp file is removed on
//! every exit path, so no plaintext outlives the call.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::VaultError;

/// Open `initial` in the user's editor and return the edited text.
pub fn edit_text(vault_dir: &Path, initial: &str) -> Result<String, VaultError> {
    let tmp = vault_dir.join(format!(".edit-{}.txt", std::process::id()));
    let result = run_editor(&tmp, initial);
    let _ = fs::remove_file(&tmp);
    result
}

fn run_editor(tmp: &Path, initial: &str) -> Result<String, VaultError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(tmp)?;
    file.write_all(initial.as_bytes())?;
    drop(file);

    let editor = env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    let status = Command::new(&editor)
        .arg(tmp)
        .status()
        .map_err(|e| VaultError::Editor(format!("failed to launch {}: {}", editor, e)))?;
    if !status.success() {
        return Err(VaultError::Editor(format!("{} exited with {}", editor, status)));
    }
    debug!(editor = %editor, "editor session finished");

    Ok(fs::read_to_string(tmp)?)
}
