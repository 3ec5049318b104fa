//! Persistence of the encrypted master secret record.

use std::path::PathBuf;

use crate::error::Result;
use crate::format::{self, EncryptedMasterSecretRecord};
use crate::storage::Storage;

/// Load/persist access to the single master secret record.
///
/// `persist` must be atomic: after it returns, or after a crash during it,
/// `load` yields either the previous record or the new one in full.
pub trait RecordStore: Send + Sync {
    fn load(&self) -> Result<EncryptedMasterSecretRecord>;

    fn persist(&self, record: &EncryptedMasterSecretRecord) -> Result<()>;

    fn exists(&self) -> bool;

    /// Where the record lives, for error messages.
    fn location(&self) -> PathBuf;
}

/// File-backed [`RecordStore`] using the v1 record format.
#[derive(Debug, Clone)]
pub struct MasterSecretStore {
    storage: Storage,
}

impl MasterSecretStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl RecordStore for MasterSecretStore {
    fn load(&self) -> Result<EncryptedMasterSecretRecord> {
        let data = self.storage.load()?;
        format::parse(&data)
    }

    fn persist(&self, record: &EncryptedMasterSecretRecord) -> Result<()> {
        let bytes = format::serialize(record)?;
        self.storage.save(&bytes)
    }

    fn exists(&self) -> bool {
        self.storage.exists()
    }

    fn location(&self) -> PathBuf {
        self.storage.path().to_path_buf()
    }
}

impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    fn load(&self) -> Result<EncryptedMasterSecretRecord> {
        (**self).load()
    }

    fn persist(&self, record: &EncryptedMasterSecretRecord) -> Result<()> {
        (**self).persist(record)
    }

    fn exists(&self) -> bool {
        (**self).exists()
    }

    fn location(&self) -> PathBuf {
        (**self).location()
    }
}
