//! Cryptographic primitives for the vault.
//!
//! Provides passphrase stretching, authenticated encryption and the
//! encrypt-then-MAC helpers shared by the master secret record and
//! encrypted content blobs.

pub mod aead;
pub mod kdf;
pub mod mac;

pub use aead::{decrypt, decrypt_in_place, encrypt, generate_nonce, generate_salt, secure_random};
pub use kdf::{DerivedKeyMaterial, KdfParams, derive_keys, derive_with_fresh_salt};
pub use mac::{compute_mac, verify_mac};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (24 bytes for XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;
/// Length of a symmetric key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of an HMAC-SHA256 tag (32 bytes).
pub const MAC_LEN: usize = 32;
/// Length of the Poly1305 tag appended by the AEAD (16 bytes).
pub const TAG_LEN: usize = 16;
