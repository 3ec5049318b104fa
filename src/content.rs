//! Encrypted content (attachments) under the unlocked master secret.
//!
//! Blob layout:
//! ```text
//! NONCE (24) | CIPHERTEXT + TAG | HMAC-SHA256 (32)
//! ```
//! The HMAC covers `nonce || ciphertext` under the master MAC key and is
//! checked before anything is allocated or decrypted.

use std::path::Path;

use zeroize::Zeroizing;

use crate::crypto::{self, MAC_LEN, NONCE_LEN, TAG_LEN, compute_mac, verify_mac};
use crate::error::{Result, VaultError};
use crate::master_secret::MasterSecret;

/// Decrypted content. Wiped when dropped.
pub type PlaintextBytes = Zeroizing<Vec<u8>>;

const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN + MAC_LEN;

/// Encrypts and decrypts content blobs, enforcing a plaintext size limit.
#[derive(Debug, Clone, Copy)]
pub struct ContentCipher {
    max_plaintext_len: usize,
}

impl ContentCipher {
    pub fn new(max_plaintext_len: usize) -> Self {
        Self { max_plaintext_len }
    }

    pub fn encrypt(&self, secret: &MasterSecret, plaintext: &[u8]) -> Result<Vec<u8>> {
        if plaintext.len() > self.max_plaintext_len {
            return Err(VaultError::OutOfResources(format!(
                "content of {} bytes exceeds limit of {} bytes",
                plaintext.len(),
                self.max_plaintext_len
            )));
        }

        let (ciphertext, nonce) = crypto::encrypt(secret.encryption_key(), plaintext)?;
        let mac = compute_mac(secret.mac_key(), &nonce, &ciphertext)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len() + MAC_LEN);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        blob.extend_from_slice(&mac);
        Ok(blob)
    }

    /// Authenticates and decrypts `blob`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Decode`] if the blob is truncated or fails authentication
    /// - [`VaultError::OutOfResources`] if the plaintext would exceed the
    ///   configured limit or cannot be allocated
    pub fn decrypt(&self, secret: &MasterSecret, blob: &[u8]) -> Result<PlaintextBytes> {
        if blob.len() < MIN_BLOB_LEN {
            return Err(VaultError::Decode(format!(
                "encrypted blob too short: {} bytes",
                blob.len()
            )));
        }

        let (nonce, rest) = blob.split_at(NONCE_LEN);
        let (ciphertext, mac) = rest.split_at(rest.len() - MAC_LEN);

        if !verify_mac(secret.mac_key(), nonce, ciphertext, mac)? {
            return Err(VaultError::Decode("content failed authentication".into()));
        }

        let plaintext_len = ciphertext.len() - TAG_LEN;
        if plaintext_len > self.max_plaintext_len {
            return Err(VaultError::OutOfResources(format!(
                "content of {plaintext_len} bytes exceeds limit of {} bytes",
                self.max_plaintext_len
            )));
        }

        let mut buf = Zeroizing::new(Vec::new());
        buf.try_reserve_exact(ciphertext.len()).map_err(|_| {
            VaultError::OutOfResources(format!("cannot allocate {plaintext_len} bytes"))
        })?;
        buf.extend_from_slice(ciphertext);

        crypto::decrypt_in_place(secret.encryption_key(), nonce, &mut buf)?;
        Ok(buf)
    }

    /// Reads and decrypts the blob stored at `content_ref`.
    pub fn decrypt_file(&self, secret: &MasterSecret, content_ref: &Path) -> Result<PlaintextBytes> {
        let blob = std::fs::read(content_ref)?;
        self.decrypt(secret, &blob)
    }
}
