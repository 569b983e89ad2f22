//! sealbox-core - Encrypted secrets vault internals
//!
//! "One file, one key, plain text in between."
//!
//! Secrets live in a single age-encrypted file. Every command decrypts
//! that file, hands the plain-text document to a mutator, and commits the
//! re-encrypted result atomically. The document itself is an ordered list
//! of named entries in an editor-friendly text format.
//!
//! Uses age encryption (X25519 + ChaCha20-Poly1305).

pub mod document;
pub mod editor;
pub mod error;
pub mod keys;
pub mod vault;

pub use document::{Document, Entry};
pub use error::VaultError;
pub use vault::{with_decrypted, VaultConfig};
