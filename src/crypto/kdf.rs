use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::{KEY_LEN, SALT_LEN, generate_salt};
use crate::error::{Result, VaultError};

/// Largest accepted Argon2 memory cost (1 GiB).
pub const MAX_MEM_COST_KIB: u32 = 1024 * 1024;
/// Largest accepted Argon2 iteration count.
pub const MAX_TIME_COST: u32 = 64;
/// Largest accepted Argon2 lane count.
pub const MAX_PARALLELISM: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // default memory cost
            mem_cost_kib: 64 * 1024, // 64 MiB
            // default number of iterations
            time_cost: 3,
            // default number of threads
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.mem_cost_kib < 8 {
            return Err(VaultError::Kdf("argon2 memory cost too low".into()));
        }
        if self.time_cost < 1 {
            return Err(VaultError::Kdf("argon2 time cost must be >= 1".into()));
        }
        if self.parallelism < 1 {
            return Err(VaultError::Kdf("argon2 parallelism must be >= 1".into()));
        }
        // record headers are not covered by the MAC
        if self.mem_cost_kib > MAX_MEM_COST_KIB {
            return Err(VaultError::Kdf(format!(
                "argon2 memory cost must be <= {MAX_MEM_COST_KIB} KiB"
            )));
        }
        if self.time_cost > MAX_TIME_COST {
            return Err(VaultError::Kdf(format!(
                "argon2 time cost must be <= {MAX_TIME_COST}"
            )));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(VaultError::Kdf(format!(
                "argon2 parallelism must be <= {MAX_PARALLELISM}"
            )));
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(VaultError::Kdf(
                "argon2 memory cost must be at least 8 * parallelism".into(),
            ));
        }
        Ok(())
    }
}

/// Encryption and authentication keys stretched from a passphrase.
///
/// Never persisted. Both keys are wiped when the value is dropped.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKeyMaterial {
    encryption_key: [u8; KEY_LEN],
    mac_key: [u8; KEY_LEN],
}

impl DerivedKeyMaterial {
    pub fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &[u8; KEY_LEN] {
        &self.mac_key
    }
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyMaterial")
            .field("encryption_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}

/// Stretches `passphrase` and `salt` into a [`DerivedKeyMaterial`] with Argon2id.
///
/// The same passphrase, salt and parameters always produce the same keys.
/// A salt of the wrong length is a programmer error and fails with
/// [`VaultError::MalformedSalt`].
pub fn derive_keys(passphrase: &str, salt: &[u8], kdf: KdfParams) -> Result<DerivedKeyMaterial> {
    if salt.len() != SALT_LEN {
        return Err(VaultError::MalformedSalt {
            expected: SALT_LEN,
            actual: salt.len(),
        });
    }
    kdf.validate()?;

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(2 * KEY_LEN),
    )
    .map_err(|e| VaultError::Kdf(format!("failed to construct Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 2 * KEY_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output[..])
        .map_err(|e| VaultError::Kdf(format!("argon2 key derivation failed {e}")))?;

    let mut keys = DerivedKeyMaterial {
        encryption_key: [0u8; KEY_LEN],
        mac_key: [0u8; KEY_LEN],
    };
    keys.encryption_key.copy_from_slice(&output[..KEY_LEN]);
    keys.mac_key.copy_from_slice(&output[KEY_LEN..]);

    Ok(keys)
}

/// Draws a new salt and derives keys from it.
pub fn derive_with_fresh_salt(
    passphrase: &str,
    kdf: KdfParams,
) -> Result<([u8; SALT_LEN], DerivedKeyMaterial)> {
    let salt = generate_salt()?;
    let keys = derive_keys(passphrase, &salt, kdf)?;
    Ok((salt, keys))
}
