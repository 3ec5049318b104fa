//! Non-secret preferences kept beside the encrypted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::storage::Storage;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default)]
    pub hint: String,
    /// When set, every derivation uses [`crate::UNENCRYPTED_PASSPHRASE`].
    #[serde(default)]
    pub password_disabled: bool,
    #[serde(default)]
    pub passphrase_changed_at: Option<DateTime<Utc>>,
}

/// JSON preference file written with the same atomic routine as the record.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    storage: Storage,
}

impl PreferenceStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// A missing file reads as default preferences.
    pub fn load(&self) -> Result<Preferences> {
        match self.storage.load() {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(VaultError::NotFound(_)) => Ok(Preferences::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let data = serde_json::to_vec_pretty(prefs)?;
        self.storage.save(&data)
    }
}
