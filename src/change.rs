//! Passphrase change: unlock with the old passphrase, re-seal the same
//! master secret under the new one, persist atomically.

use chrono::Utc;

use crate::error::{Result, VaultError};
use crate::format::EncryptedMasterSecretRecord;
use crate::hint::validate_hint;
use crate::master_secret::MasterSecret;
use crate::prefs::Preferences;
use crate::store::RecordStore;
use crate::unlock::{seal, unlock};
use crate::{UNENCRYPTED_PASSPHRASE, Vault};

/// Progress of a single passphrase change request.
///
/// ```text
/// Idle -> Verifying -> Unlocked -> ReEncrypting -> Persisted
///            |            |             |
///            +------------+-------------+--> Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    Idle,
    Verifying,
    Unlocked,
    ReEncrypting,
    Persisted,
    Rejected,
}

impl ChangeState {
    pub fn can_transition_to(self, next: ChangeState) -> bool {
        use ChangeState::*;
        matches!(
            (self, next),
            (Idle, Verifying)
                | (Verifying, Unlocked)
                | (Verifying, Rejected)
                | (Unlocked, ReEncrypting)
                | (Unlocked, Rejected)
                | (ReEncrypting, Persisted)
                | (ReEncrypting, Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ChangeState::Persisted | ChangeState::Rejected)
    }
}

struct ChangeRun<'a> {
    state: ChangeState,
    on_transition: &'a mut dyn FnMut(ChangeState),
}

impl ChangeRun<'_> {
    fn advance(&mut self, next: ChangeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(from = ?self.state, to = ?next, "passphrase change");
        self.state = next;
        (self.on_transition)(next);
    }
}

impl<S: RecordStore> Vault<S> {
    /// Re-encrypts the master secret under `new` and stores `hint`.
    ///
    /// Returns the unchanged master secret. On any error the persisted
    /// record still unlocks with `old`. A successful change always clears
    /// the password-disabled flag.
    pub fn change_passphrase(&self, old: &str, new: &str, hint: &str) -> Result<MasterSecret> {
        self.change_passphrase_with(old, new, hint, &mut |_| {})
    }

    /// [`Vault::change_passphrase`], reporting each state it enters.
    pub fn change_passphrase_with(
        &self,
        old: &str,
        new: &str,
        hint: &str,
        on_transition: &mut dyn FnMut(ChangeState),
    ) -> Result<MasterSecret> {
        if new.is_empty() {
            return Err(VaultError::EmptyPassphrase);
        }

        self.ensure_exists()?;
        // held until Persisted or Rejected
        let _guard = self.lock_changes()?;

        let mut run = ChangeRun {
            state: ChangeState::Idle,
            on_transition,
        };

        let result = self.run_change(&mut run, old, new, hint);
        if let Err(e) = &result {
            if !run.state.is_terminal() {
                run.advance(ChangeState::Rejected);
            }
            match e {
                VaultError::InvalidPassphrase => {
                    tracing::warn!("passphrase change rejected: invalid passphrase")
                }
                other => tracing::warn!(error = %other, "passphrase change rejected"),
            }
        }
        result
    }

    fn run_change(
        &self,
        run: &mut ChangeRun<'_>,
        old: &str,
        new: &str,
        hint: &str,
    ) -> Result<MasterSecret> {
        run.advance(ChangeState::Verifying);

        let prefs = self.prefs.load()?;
        let old = if prefs.password_disabled {
            UNENCRYPTED_PASSPHRASE
        } else {
            old
        };

        let previous = self.store.load()?;
        let secret = unlock(&previous, old)?;
        run.advance(ChangeState::Unlocked);

        validate_hint(new, hint)?;
        run.advance(ChangeState::ReEncrypting);

        let record = seal(&secret, new, *previous.kdf())?;
        self.replace_record(&record, &previous)?;

        let updated = Preferences {
            hint: hint.to_string(),
            password_disabled: false,
            passphrase_changed_at: Some(Utc::now()),
        };
        if let Err(e) = self.prefs.save(&updated) {
            // the flag and the record must agree; put the old record back
            self.restore_record(&previous);
            return Err(e);
        }

        run.advance(ChangeState::Persisted);
        tracing::info!("master secret re-encrypted under new passphrase");
        Ok(secret)
    }

    /// Re-seals the master secret under [`UNENCRYPTED_PASSPHRASE`] and sets
    /// the password-disabled flag. The stored hint is cleared.
    pub fn disable_passphrase(&self, current: &str) -> Result<MasterSecret> {
        self.ensure_exists()?;
        let _guard = self.lock_changes()?;

        let prefs = self.prefs.load()?;
        let current = if prefs.password_disabled {
            UNENCRYPTED_PASSPHRASE
        } else {
            current
        };

        let previous = self.store.load()?;
        let secret = unlock(&previous, current)?;

        let record = seal(&secret, UNENCRYPTED_PASSPHRASE, *previous.kdf())?;
        self.replace_record(&record, &previous)?;

        let updated = Preferences {
            hint: String::new(),
            password_disabled: true,
            passphrase_changed_at: Some(Utc::now()),
        };
        if let Err(e) = self.prefs.save(&updated) {
            self.restore_record(&previous);
            return Err(e);
        }

        tracing::info!("passphrase protection disabled");
        Ok(secret)
    }

    /// Persists `record`. A failed persist may still have replaced the file
    /// (e.g. the directory sync failed after the rename), so `previous` is
    /// written back before the error is returned.
    fn replace_record(
        &self,
        record: &EncryptedMasterSecretRecord,
        previous: &EncryptedMasterSecretRecord,
    ) -> Result<()> {
        self.store.persist(record).inspect_err(|_| self.restore_record(previous))
    }

    fn restore_record(&self, previous: &EncryptedMasterSecretRecord) {
        if let Err(restore) = self.store.persist(previous) {
            tracing::error!(error = %restore, "failed to restore previous master secret record");
        }
    }
}
