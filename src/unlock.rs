//! Passphrase verification and sealing of the master secret.
//!
//! The record is encrypt-then-MAC: XChaCha20-Poly1305 under the derived
//! encryption key, then HMAC-SHA256 over `iv || ciphertext` under the
//! derived authentication key. Unlocking checks the MAC first and only
//! decrypts once it matches.

use crate::crypto::{self, KdfParams, compute_mac, derive_keys, derive_with_fresh_salt, verify_mac};
use crate::error::{Result, VaultError};
use crate::format::EncryptedMasterSecretRecord;
use crate::master_secret::MasterSecret;

/// Recovers the master secret from `record` with `candidate`.
///
/// A wrong passphrase or a tampered record fails with
/// [`VaultError::InvalidPassphrase`]; no decryption is attempted then.
pub fn unlock(record: &EncryptedMasterSecretRecord, candidate: &str) -> Result<MasterSecret> {
    let keys = derive_keys(candidate, record.salt(), *record.kdf())?;

    if !verify_mac(keys.mac_key(), record.iv(), record.ciphertext(), record.mac())? {
        return Err(VaultError::InvalidPassphrase);
    }

    let plaintext = crypto::decrypt(keys.encryption_key(), record.iv(), record.ciphertext())
        .map_err(|_| VaultError::CorruptRecord("authenticated record failed to decrypt".into()))?;

    MasterSecret::from_bytes(&plaintext)
}

/// Encrypts `secret` under keys derived from `passphrase` and a fresh salt.
pub fn seal(
    secret: &MasterSecret,
    passphrase: &str,
    kdf: KdfParams,
) -> Result<EncryptedMasterSecretRecord> {
    let (salt, keys) = derive_with_fresh_salt(passphrase, kdf)?;

    let plaintext = secret.to_bytes();
    let (ciphertext, iv) = crypto::encrypt(keys.encryption_key(), plaintext.as_slice())?;
    let mac = compute_mac(keys.mac_key(), &iv, &ciphertext)?;

    Ok(EncryptedMasterSecretRecord::new(kdf, salt, iv, mac, ciphertext))
}
