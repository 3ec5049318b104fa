//! HMAC-SHA256 over `iv || ciphertext`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::MAC_LEN;
use crate::error::{Result, VaultError};

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(format!("invalid MAC key: {e}")))?;
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}

pub fn compute_mac(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<[u8; MAC_LEN]> {
    let tag = keyed(key, iv, ciphertext)?.finalize().into_bytes();
    Ok(tag.into())
}

/// Checks `expected` against the MAC of `iv || ciphertext` in constant time.
///
/// Returns `Ok(false)` on mismatch so each caller can choose its own error.
pub fn verify_mac(key: &[u8], iv: &[u8], ciphertext: &[u8], expected: &[u8]) -> Result<bool> {
    Ok(keyed(key, iv, ciphertext)?.verify_slice(expected).is_ok())
}
