//! Identity key management
//!
//! The vault key is an age X25519 identity stored in a single file with
//! owner-only permissions. Loading is idempotent; creation is exclusive,
//! so two racing processes can never end up with different keys in play.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519::Identity;
use tracing::debug;

use crate::error::VaultError;

/// Load the identity at `path`, generating and persisting a fresh one if
/// the file does not exist. Never overwrites an existing key file.
pub fn load_or_create(path: &Path) -> Result<Identity, VaultError> {
    if path.exists() {
        return load(path);
    }
    create(path)
}

fn load(path: &Path) -> Result<Identity, VaultError> {
    let content = fs::read_to_string(path)?;
    content
        .trim()
        .parse::<Identity>()
        .map_err(|e| VaultError::KeyFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn create(path: &Path) -> Result<Identity, VaultError> {
    let identity = Identity::generate();
    let encoded = identity.to_string();

    // Exclusive create: if another process won the race, surface the
    // conflict instead of clobbering its key.
    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(VaultError::KeyConflict {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(encoded.expose_secret().as_bytes())?;

    debug!(path = %path.display(), "generated new identity key");
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_key_path() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = env::temp_dir().join(format!("sealbox_keys_{}_{}", std::process::id(), id));
        fs::create_dir_all(&dir).unwrap();
        dir.join("identity.key")
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_create_then_load_is_stable() {
        let path = temp_key_path();

        let first = load_or_create(&path).unwrap();
        let second = load_or_create(&path).unwrap();
        assert_eq!(
            first.to_string().expose_secret(),
            second.to_string().expose_secret()
        );

        cleanup(&path);
    }

    #[test]
    fn test_key_file_is_owner_only() {
        let path = temp_key_path();

        load_or_create(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        cleanup(&path);
    }

    #[test]
    fn test_garbage_key_file_is_rejected() {
        let path = temp_key_path();
        fs::write(&path, "not an identity").unwrap();

        let err = match load_or_create(&path) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, VaultError::KeyFormat { .. }));

        cleanup(&path);
    }

    #[test]
    fn test_lost_create_race_is_a_conflict() {
        let path = temp_key_path();
        // Simulate another process winning the exclusive create
        fs::write(&path, "winner").unwrap();

        let err = match create(&path) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, VaultError::KeyConflict { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "winner");

        cleanup(&path);
    }
}
