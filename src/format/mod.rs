//! File format handling for the master secret record.
//!
//! Provides version-aware parsing and serialization of the record file.

use crate::crypto::{KdfParams, MAC_LEN, NONCE_LEN, SALT_LEN};
use crate::error::{Result, VaultError};

pub mod v1;

/// Magic bytes identifying a master secret record ("MVLT").
pub const MAGIC: &[u8; 4] = b"MVLT";
/// Length of magic bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of version field.
pub const VER_LEN: usize = 1;
/// Latest format version
pub const CURRENT_VERSION: u8 = v1::VERSION_V1;

/// The persisted, encrypted form of the master secret.
///
/// `mac` authenticates `iv || ciphertext` under the authentication key
/// derived from the passphrase, `salt` and `kdf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMasterSecretRecord {
    version: u8,
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    iv: [u8; NONCE_LEN],
    mac: [u8; MAC_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedMasterSecretRecord {
    /// Creates a record in the current format version.
    pub fn new(
        kdf: KdfParams,
        salt: [u8; SALT_LEN],
        iv: [u8; NONCE_LEN],
        mac: [u8; MAC_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            kdf,
            salt,
            iv,
            mac,
            ciphertext,
        }
    }

    /// Returns the file format version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the KDF parameters used for key derivation.
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; NONCE_LEN] {
        &self.iv
    }

    pub fn mac(&self) -> &[u8; MAC_LEN] {
        &self.mac
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    #[cfg(test)]
    pub(crate) fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }
}

/// Parses a record file.
///
/// Automatically dispatches to the appropriate version parser.
///
/// # Errors
///
/// Returns [`VaultError::CorruptRecord`] if:
/// - The file is too short
/// - The magic bytes are invalid
/// - The version is unsupported
pub fn parse(data: &[u8]) -> Result<EncryptedMasterSecretRecord> {
    if data.len() < MAGIC_LEN + VER_LEN {
        return Err(VaultError::CorruptRecord("file too short".into()));
    }

    if &data[..MAGIC_LEN] != MAGIC {
        return Err(VaultError::CorruptRecord("invalid magic".into()));
    }

    let version = data[MAGIC_LEN];

    match version {
        1 => v1::parse(data),
        _ => Err(VaultError::CorruptRecord(format!(
            "unsupported version: {version}"
        ))),
    }
}

/// Serializes a record to bytes.
///
/// # Errors
///
/// Returns an error if the version is unsupported.
pub fn serialize(record: &EncryptedMasterSecretRecord) -> Result<Vec<u8>> {
    match record.version() {
        1 => v1::serialize(record),
        v => Err(VaultError::CorruptRecord(format!("unsupported version: {v}"))),
    }
}
