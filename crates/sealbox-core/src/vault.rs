//! Encrypted vault file lifecycle
//!
//! A vault is one age-encrypted secrets file plus one identity key.
//! Every mutation runs as a scoped decrypt -> mutate -> encrypt -> commit
//! cycle. The commit writes a sibling temp file and renames it over the
//! destination, so the on-disk blob is always a complete document: either
//! the old one or the new one, never a mixture.

use std::env;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::fs::{symlink, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use age::x25519::Identity;
use tracing::debug;

use crate::document::Document;
use crate::error::VaultError;
use crate::keys;

/// Resolved per-vault paths, constructed once at the CLI boundary and
/// threaded through every operation.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Identity key file
    pub key_path: PathBuf,
    /// Encrypted secrets file
    pub secrets_path: PathBuf,
}

impl VaultConfig {
    /// The private vault directory (`$SEALBOX_DIR` overrides the default
    /// under the user data dir).
    pub fn vault_dir() -> PathBuf {
        if let Some(dir) = env::var_os("SEALBOX_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("sealbox")
    }

    /// Resolve the default key and secrets paths from the vault directory.
    pub fn resolve() -> Result<Self, VaultError> {
        Self::resolve_in(&Self::vault_dir())
    }

    fn resolve_in(dir: &Path) -> Result<Self, VaultError> {
        let secrets_path = fs::read_link(dir.join("secrets"))?;
        Ok(Self {
            key_path: dir.join("identity.key"),
            secrets_path,
        })
    }
}

/// Whether `dir` already holds an initialized vault.
pub fn is_initialized(dir: &Path) -> bool {
    fs::symlink_metadata(dir.join("secrets")).is_ok()
}

/// Initialize the vault: private directory, identity key, an empty
/// secrets file at `secrets_path` if none exists, and the stable
/// `secrets` symlink. The symlink is created once and never replaced.
pub fn init_vault(dir: &Path, secrets_path: &Path) -> Result<VaultConfig, VaultError> {
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, Permissions::from_mode(0o700))?;

    let key_path = dir.join("identity.key");
    keys::load_or_create(&key_path)?;

    if !secrets_path.exists() {
        let file = File::create(secrets_path)?;
        file.set_permissions(Permissions::from_mode(0o600))?;
    }

    let link = dir.join("secrets");
    if fs::symlink_metadata(&link).is_err() {
        let target = fs::canonicalize(secrets_path)?;
        symlink(&target, &link)?;
        debug!(target = %target.display(), "linked default secrets file");
    }

    VaultConfig::resolve_in(dir)
}

/// Run one decrypt -> mutate -> encrypt -> commit cycle over the vault.
///
/// A zero-byte secrets file is the bootstrap case and decrypts to the
/// empty document. Any failure before the mutator runs aborts with the
/// file untouched; any failure after it leaves the previous blob in
/// place, because the new one only lands via the final rename.
pub fn with_decrypted<F>(config: &VaultConfig, mutator: F) -> Result<(), VaultError>
where
    F: FnOnce(Document) -> Result<Document, VaultError>,
{
    let identity = keys::load_or_create(&config.key_path)?;

    let blob = fs::read(&config.secrets_path)?;
    let document = if blob.is_empty() {
        Document::new()
    } else {
        let plaintext = decrypt(&blob, &identity, &config.secrets_path)?;
        let text = String::from_utf8(plaintext).map_err(|_| VaultError::Parse {
            line: 1,
            reason: "decrypted document is not valid UTF-8".to_string(),
        })?;
        Document::parse(&text)?
    };

    let updated = mutator(document)?;

    let blob = encrypt(updated.serialize().as_bytes(), &identity)?;
    commit(&config.secrets_path, &blob)
}

/// Encrypt plaintext to the vault identity. age derives fresh file-key
/// and nonce material on every call, so no two blobs share a nonce.
fn encrypt(plaintext: &[u8], identity: &Identity) -> Result<Vec<u8>, VaultError> {
    let recipient = identity.to_public();
    let encryptor = age::Encryptor::with_recipients(vec![Box::new(recipient)])
        .expect("one recipient is always supplied");

    let mut blob = vec![];
    let mut writer = encryptor
        .wrap_output(&mut blob)
        .map_err(|e| VaultError::Io(io::Error::new(ErrorKind::Other, e.to_string())))?;
    writer.write_all(plaintext)?;
    writer
        .finish()
        .map_err(|e| VaultError::Io(io::Error::new(ErrorKind::Other, e.to_string())))?;

    Ok(blob)
}

/// Decrypt a blob, failing hard on any authentication or integrity
/// problem. A tampered byte anywhere surfaces here, never as garbage
/// plaintext.
fn decrypt(blob: &[u8], identity: &Identity, path: &Path) -> Result<Vec<u8>, VaultError> {
    let failed = || VaultError::Decryption {
        path: path.to_path_buf(),
    };

    let decryptor = match age::Decryptor::new(blob).map_err(|_| failed())? {
        age::Decryptor::Recipients(d) => d,
        _ => return Err(failed()),
    };

    let mut plaintext = vec![];
    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .map_err(|_| failed())?;
    reader.read_to_end(&mut plaintext).map_err(|_| failed())?;

    debug!(path = %path.display(), bytes = plaintext.len(), "decrypted vault file");
    Ok(plaintext)
}

/// Publish a new blob atomically: sibling temp file, sync, rename.
fn commit(path: &Path, blob: &[u8]) -> Result<(), VaultError> {
    let name = path.file_name().ok_or_else(|| {
        VaultError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            "secrets path has no file name",
        ))
    })?;
    let tmp = path.with_file_name(format!(".{}.tmp", name.to_string_lossy()));

    let result = write_and_rename(&tmp, path, blob);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, path: &Path, blob: &[u8]) -> Result<(), VaultError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(tmp)?;
    file.write_all(blob)?;
    file.sync_all()?;
    drop(file);

    fs::rename(tmp, path)?;
    debug!(path = %path.display(), bytes = blob.len(), "committed vault file");
    Ok(())
}
