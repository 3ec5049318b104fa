//! File format v1 for the master secret record.
//!
//! V1 File Format:
//! ```text
//! MAGIC (4) | VERSION (1) | MEM_COST (4) | TIME_COST (4) | PARALLELISM (4) | SALT (16) | IV (24) | MAC (32) | CIPHERTEXT
//! ```

use super::{EncryptedMasterSecretRecord, MAGIC};
use crate::{
    crypto::{KdfParams, MAC_LEN, NONCE_LEN, SALT_LEN, TAG_LEN},
    error::{Result, VaultError},
    format::{MAGIC_LEN, VER_LEN},
};

/// Current file format version.
pub const VERSION_V1: u8 = 1;

const MEM_LEN: usize = 4;
const TIME_LEN: usize = 4;
const PAR_LEN: usize = 4;

const HEADER_LEN: usize =
    MAGIC_LEN + VER_LEN + MEM_LEN + TIME_LEN + PAR_LEN + SALT_LEN + NONCE_LEN + MAC_LEN;

fn corrupt(msg: &str) -> VaultError {
    VaultError::CorruptRecord(msg.to_string())
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = data[offset..offset + 4]
        .try_into()
        .map_err(|_| corrupt("truncated integer field"))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Parses a v1 record file.
///
/// # Errors
///
/// Returns an error if the file is too short or has invalid parameters.
pub fn parse(data: &[u8]) -> Result<EncryptedMasterSecretRecord> {
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(corrupt("file too short for v1"));
    }

    let mut offset = MAGIC_LEN + VER_LEN;

    let mem_cost = read_u32(data, offset)?;
    offset += MEM_LEN;

    let time_cost = read_u32(data, offset)?;
    offset += TIME_LEN;

    let parallelism = read_u32(data, offset)?;
    offset += PAR_LEN;

    let salt: [u8; SALT_LEN] = data[offset..offset + SALT_LEN]
        .try_into()
        .map_err(|_| corrupt("invalid salt length"))?;
    offset += SALT_LEN;

    let iv: [u8; NONCE_LEN] = data[offset..offset + NONCE_LEN]
        .try_into()
        .map_err(|_| corrupt("invalid iv length"))?;
    offset += NONCE_LEN;

    let mac: [u8; MAC_LEN] = data[offset..offset + MAC_LEN]
        .try_into()
        .map_err(|_| corrupt("invalid mac length"))?;
    offset += MAC_LEN;

    let ciphertext = data[offset..].to_vec();

    let kdf = KdfParams::new(mem_cost, time_cost, parallelism)
        .map_err(|e| VaultError::CorruptRecord(format!("invalid kdf parameters: {e}")))?;

    Ok(EncryptedMasterSecretRecord::new(kdf, salt, iv, mac, ciphertext))
}

/// Serializes a record to v1 format bytes.
///
/// # Errors
///
/// Returns an error if the version is not v1.
pub fn serialize(record: &EncryptedMasterSecretRecord) -> Result<Vec<u8>> {
    if record.version() != VERSION_V1 {
        return Err(corrupt("wrong version for v1 serializer"));
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + record.ciphertext().len());

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_V1);

    buf.extend_from_slice(&record.kdf().mem_cost_kib().to_le_bytes());
    buf.extend_from_slice(&record.kdf().time_cost().to_le_bytes());
    buf.extend_from_slice(&record.kdf().parallelism().to_le_bytes());

    buf.extend_from_slice(record.salt());
    buf.extend_from_slice(record.iv());
    buf.extend_from_slice(record.mac());
    buf.extend_from_slice(record.ciphertext());

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedMasterSecretRecord {
        EncryptedMasterSecretRecord::new(
            KdfParams::new(65536, 3, 2).unwrap(),
            [1u8; 16],
            [2u8; 24],
            [3u8; 32],
            vec![4u8; 80],
        )
    }

    #[test]
    fn header_roundtrip() {
        let record = sample();

        let bytes = serialize(&record).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 80);

        let parsed = super::super::parse(&bytes).unwrap();
        assert_eq!(parsed.version(), VERSION_V1);
        assert_eq!(parsed.kdf().mem_cost_kib(), 65536);
        assert_eq!(parsed.kdf().time_cost(), 3);
        assert_eq!(parsed.kdf().parallelism(), 2);
        assert_eq!(parsed, record);
    }

    #[test]
    fn header_invalid_magic_fails() {
        let mut data = serialize(&sample()).unwrap();
        data[..4].copy_from_slice(b"FAIL");

        assert!(super::super::parse(&data).is_err());
    }

    #[test]
    fn header_unsupported_version_fails() {
        let mut data = serialize(&sample()).unwrap();
        data[4] = 99;

        assert!(super::super::parse(&data).is_err());
    }

    #[test]
    fn header_too_short_fails() {
        let data = serialize(&sample()).unwrap();
        assert!(super::super::parse(&data[..HEADER_LEN]).is_err());
        assert!(super::super::parse(&data[..3]).is_err());
    }

    #[test]
    fn invalid_kdf_parameters_are_corrupt() {
        let mut data = serialize(&sample()).unwrap();
        data[5..9].copy_from_slice(&0u32.to_le_bytes());

        assert!(matches!(
            super::super::parse(&data),
            Err(VaultError::CorruptRecord(_))
        ));
    }

    #[test]
    fn oversized_kdf_costs_are_corrupt() {
        let clean = serialize(&sample()).unwrap();

        for (range, label) in [(5..9, "mem"), (9..13, "time"), (13..17, "parallelism")] {
            let mut data = clean.clone();
            data[range].copy_from_slice(&u32::MAX.to_le_bytes());

            assert!(
                matches!(super::super::parse(&data), Err(VaultError::CorruptRecord(_))),
                "maxed {label} cost was accepted"
            );
        }
    }
}
