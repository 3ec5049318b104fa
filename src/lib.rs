//! Passphrase protection for a locally stored master secret.
//!
//! A [`Vault`] keeps one encrypted [`MasterSecret`] on disk, unlocks it with
//! a passphrase, and rotates the passphrase without changing the secret.
//! The unlocked secret then decrypts attachments ([`content`]) and feeds the
//! thumbnail pipeline ([`thumbnail`]). [`session::PassphraseSession`] runs
//! these operations on a single background slot.

mod change;
mod config;
pub mod content;
pub mod crypto;
mod error;
pub mod format;
mod hint;
mod master_secret;
mod prefs;
pub mod session;
mod storage;
mod store;
pub mod thumbnail;
mod unlock;
pub mod worker;

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use directories::ProjectDirs;

pub use crate::change::ChangeState;
pub use crate::config::Settings;
pub use crate::crypto::KdfParams;
pub use crate::error::{HintError, Result, VaultError};
pub use crate::format::EncryptedMasterSecretRecord;
pub use crate::hint::{MAX_HINT_LEN, MIN_HINT_LEN, validate_hint};
pub use crate::master_secret::{MASTER_SECRET_LEN, MasterSecret};
pub use crate::prefs::{PreferenceStore, Preferences};
pub use crate::storage::Storage;
pub use crate::store::{MasterSecretStore, RecordStore};
pub use crate::unlock::{seal, unlock};

/// Passphrase used for every derivation while protection is disabled.
pub const UNENCRYPTED_PASSPHRASE: &str = "unencrypted";
/// File name of the encrypted master secret record inside a vault directory.
pub const RECORD_FILE: &str = "vault.mvlt";
/// File name of the preference file inside a vault directory.
pub const PREFERENCES_FILE: &str = "preferences.json";
/// Lock file held while the record or preferences are being rewritten.
pub const LOCK_FILE: &str = "vault.lock";

pub struct Vault<S: RecordStore = MasterSecretStore> {
    store: S,
    prefs: PreferenceStore,
    settings: Settings,
    change_lock: Mutex<()>,
}

impl Vault<MasterSecretStore> {
    /// Opens the vault files inside `dir`. Nothing is read until first use.
    pub fn open_in(dir: &Path, settings: Settings) -> Self {
        let store = MasterSecretStore::new(Storage::new(dir.join(RECORD_FILE)));
        let prefs = PreferenceStore::new(Storage::new(dir.join(PREFERENCES_FILE)));
        Self::with_store(store, prefs, settings)
    }

    pub fn open_default(settings: Settings) -> Result<Self> {
        Ok(Self::open_in(&default_dir()?, settings))
    }
}

impl<S: RecordStore> Vault<S> {
    pub fn with_store(store: S, prefs: PreferenceStore, settings: Settings) -> Self {
        Self {
            store,
            prefs,
            settings,
            change_lock: Mutex::new(()),
        }
    }

    pub fn exists(&self) -> bool {
        self.store.exists()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Generates a new master secret and persists it.
    ///
    /// With `passphrase == None` the secret is sealed under
    /// [`UNENCRYPTED_PASSPHRASE`] and the password-disabled flag is set.
    /// A supplied `hint` is validated against the passphrase first.
    pub fn initialize(&self, passphrase: Option<&str>, hint: Option<&str>) -> Result<MasterSecret> {
        let _guard = self.lock_changes()?;

        if self.store.exists() {
            return Err(VaultError::AlreadyExists(self.location()));
        }

        let mut prefs = Preferences::default();
        let effective = match passphrase {
            Some("") => return Err(VaultError::EmptyPassphrase),
            Some(passphrase) => {
                if let Some(hint) = hint {
                    validate_hint(passphrase, hint)?;
                    prefs.hint = hint.to_string();
                }
                passphrase
            }
            None => {
                prefs.password_disabled = true;
                UNENCRYPTED_PASSPHRASE
            }
        };

        let secret = MasterSecret::generate()?;
        let record = seal(&secret, effective, self.settings.kdf())?;

        self.prefs.save(&prefs)?;
        self.store.persist(&record)?;

        tracing::info!(
            password_disabled = prefs.password_disabled,
            "created master secret"
        );
        Ok(secret)
    }

    /// Verifies `candidate` against the stored record and returns the secret.
    ///
    /// While protection is disabled the candidate is ignored and the sentinel
    /// passphrase is used instead.
    pub fn unlock(&self, candidate: &str) -> Result<MasterSecret> {
        let prefs = self.prefs.load()?;
        let candidate = if prefs.password_disabled {
            UNENCRYPTED_PASSPHRASE
        } else {
            candidate
        };

        let record = self.store.load()?;
        match unlock(&record, candidate) {
            Err(VaultError::InvalidPassphrase) => {
                tracing::warn!("unlock rejected: invalid passphrase");
                Err(VaultError::InvalidPassphrase)
            }
            other => other,
        }
    }

    pub fn preferences(&self) -> Result<Preferences> {
        self.prefs.load()
    }

    pub fn hint(&self) -> Result<String> {
        Ok(self.prefs.load()?.hint)
    }

    pub fn is_password_disabled(&self) -> Result<bool> {
        Ok(self.prefs.load()?.password_disabled)
    }

    /// The raw encrypted record, for inspection.
    pub fn record(&self) -> Result<EncryptedMasterSecretRecord> {
        self.store.load()
    }

    /// Serializes mutations across threads and across processes sharing the
    /// vault directory. Released when the guard drops.
    fn lock_changes(&self) -> Result<ChangeGuard<'_>> {
        let local = self
            .change_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let path = self.location().with_file_name(LOCK_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock()?;
        tracing::trace!(path = %path.display(), "vault lock acquired");

        Ok(ChangeGuard {
            _file: file,
            _local: local,
        })
    }

    fn ensure_exists(&self) -> Result<()> {
        if self.store.exists() {
            Ok(())
        } else {
            Err(VaultError::NotFound(self.location()))
        }
    }

    fn location(&self) -> PathBuf {
        self.store.location()
    }
}

/// Closing the file drops the OS lock; the in-process guard drops after it.
struct ChangeGuard<'a> {
    _file: File,
    _local: MutexGuard<'a, ()>,
}

/// Platform data directory used when no vault directory is given.
pub fn default_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "mastervault").ok_or_else(|| VaultError::Io {
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine platform directories",
        ),
    })?;

    Ok(project_dirs.data_dir().to_path_buf())
}
