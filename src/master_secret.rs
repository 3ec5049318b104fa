//! The unlocked root key material.

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{KEY_LEN, secure_random};
use crate::error::{Result, VaultError};

/// Serialized length of a [`MasterSecret`]: encryption key followed by MAC key.
pub const MASTER_SECRET_LEN: usize = 2 * KEY_LEN;

/// Root symmetric keys protecting all other locally encrypted data.
///
/// Generated once per vault and never changed by a passphrase change; only
/// the protection around it rotates. Wiped from memory on drop.
#[derive(Clone)]
pub struct MasterSecret {
    encryption_key: [u8; KEY_LEN],
    mac_key: [u8; KEY_LEN],
}

impl MasterSecret {
    pub fn generate() -> Result<Self> {
        let mut secret = Self {
            encryption_key: [0u8; KEY_LEN],
            mac_key: [0u8; KEY_LEN],
        };
        secure_random(&mut secret.encryption_key)?;
        secure_random(&mut secret.mac_key)?;
        Ok(secret)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != MASTER_SECRET_LEN {
            return Err(VaultError::CorruptRecord(format!(
                "master secret has wrong size: {} bytes (expected {MASTER_SECRET_LEN})",
                bytes.len()
            )));
        }

        let mut secret = Self {
            encryption_key: [0u8; KEY_LEN],
            mac_key: [0u8; KEY_LEN],
        };
        secret.encryption_key.copy_from_slice(&bytes[..KEY_LEN]);
        secret.mac_key.copy_from_slice(&bytes[KEY_LEN..]);
        Ok(secret)
    }

    pub(crate) fn to_bytes(&self) -> Zeroizing<[u8; MASTER_SECRET_LEN]> {
        let mut out = Zeroizing::new([0u8; MASTER_SECRET_LEN]);
        out[..KEY_LEN].copy_from_slice(&self.encryption_key);
        out[KEY_LEN..].copy_from_slice(&self.mac_key);
        out
    }

    /// Avoid storing or logging this value.
    pub fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &[u8; KEY_LEN] {
        &self.mac_key
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecret")
            .field("encryption_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}
