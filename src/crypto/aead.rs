use super::{NONCE_LEN, SALT_LEN};
use crate::error::{Result, VaultError};
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadInPlace, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

/// Fill buffer with cryptographically secure random bytes
pub fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| VaultError::Crypto("OS random generator unavailable".into()))
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh XChaCha20 nonce
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

/// Encrypt plaintext under a random nonce
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = generate_nonce()?;

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| VaultError::Crypto("encryption failed".into()))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext
pub fn decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::Decode("ciphertext failed authentication".into()))?;
    Ok(Zeroizing::new(plaintext))
}

/// Decrypt `buf` in place; on success the tag is stripped and `buf` holds plaintext.
pub fn decrypt_in_place(key: &[u8], nonce: &[u8], buf: &mut Vec<u8>) -> Result<()> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .decrypt_in_place(XNonce::from_slice(nonce), b"", buf)
        .map_err(|_| VaultError::Decode("ciphertext failed authentication".into()))
}
