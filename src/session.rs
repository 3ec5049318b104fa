//! An unlocked vault bound to one background slot.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::master_secret::MasterSecret;
use crate::store::{MasterSecretStore, RecordStore};
use crate::thumbnail::{AttachmentPreviewer, Thumbnail};
use crate::worker::TaskSlot;
use crate::Vault;

type SecretCell = Arc<Mutex<Option<MasterSecret>>>;

/// Holds the unlocked [`MasterSecret`] for as long as the session lives.
///
/// `unlock`, `change_passphrase` and `thumbnail` run on the session's
/// [`TaskSlot`], so at most one of them is in flight; a second request
/// fails with [`VaultError::Busy`]. The secret is zeroed on
/// [`invalidate`](Self::invalidate) and when the session is dropped.
pub struct PassphraseSession<S: RecordStore + 'static = MasterSecretStore> {
    vault: Arc<Vault<S>>,
    previewer: Arc<AttachmentPreviewer>,
    secret: SecretCell,
    slot: TaskSlot,
}

fn lock(cell: &SecretCell) -> MutexGuard<'_, Option<MasterSecret>> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: RecordStore + 'static> PassphraseSession<S> {
    pub fn new(vault: Arc<Vault<S>>, slot: TaskSlot) -> Self {
        let previewer = Arc::new(AttachmentPreviewer::from_settings(vault.settings()));
        Self::with_previewer(vault, previewer, slot)
    }

    pub fn with_previewer(
        vault: Arc<Vault<S>>,
        previewer: Arc<AttachmentPreviewer>,
        slot: TaskSlot,
    ) -> Self {
        Self {
            vault,
            previewer,
            secret: Arc::new(Mutex::new(None)),
            slot,
        }
    }

    pub fn vault(&self) -> &Vault<S> {
        &self.vault
    }

    pub fn is_unlocked(&self) -> bool {
        lock(&self.secret).is_some()
    }

    /// A copy of the unlocked secret for direct content encryption.
    pub fn secret(&self) -> Result<MasterSecret> {
        lock(&self.secret).clone().ok_or(VaultError::Locked)
    }

    pub async fn unlock(&self, candidate: Zeroizing<String>) -> Result<()> {
        let vault = Arc::clone(&self.vault);
        let cell = Arc::clone(&self.secret);

        self.slot
            .submit(move || {
                let secret = vault.unlock(&candidate)?;
                *lock(&cell) = Some(secret);
                Ok(())
            })?
            .wait()
            .await
    }

    /// Rotates the passphrase. The session holds the (unchanged) secret
    /// afterwards, even if it was locked before.
    pub async fn change_passphrase(
        &self,
        old: Zeroizing<String>,
        new: Zeroizing<String>,
        hint: String,
    ) -> Result<()> {
        let vault = Arc::clone(&self.vault);
        let cell = Arc::clone(&self.secret);

        self.slot
            .submit(move || {
                let secret = vault.change_passphrase(&old, &new, &hint)?;
                *lock(&cell) = Some(secret);
                Ok(())
            })?
            .wait()
            .await
    }

    /// Thumbnail of the encrypted content at `content_ref`, or `None` for
    /// non-image content. `max_dimension` defaults to the vault settings.
    pub async fn thumbnail(
        &self,
        content_ref: PathBuf,
        content_type: String,
        max_dimension: Option<u32>,
    ) -> Result<Option<Thumbnail>> {
        let secret = self.secret()?;
        let previewer = Arc::clone(&self.previewer);
        let max_dimension =
            max_dimension.unwrap_or_else(|| self.vault.settings().thumbnail_max_dimension());

        self.slot
            .submit(move || {
                previewer.generate_thumbnail(&secret, &content_ref, &content_type, max_dimension)
            })?
            .wait()
            .await
    }

    /// [`thumbnail`](Self::thumbnail), treating undecodable or oversized
    /// content as having no preview.
    pub async fn thumbnail_or_none(
        &self,
        content_ref: PathBuf,
        content_type: String,
        max_dimension: Option<u32>,
    ) -> Result<Option<Thumbnail>> {
        match self.thumbnail(content_ref, content_type, max_dimension).await {
            Err(e) if e.is_content_failure() => {
                tracing::warn!(error = %e, "no thumbnail for content");
                Ok(None)
            }
            other => other,
        }
    }

    /// Zeroes and drops the unlocked secret.
    pub fn invalidate(&self) {
        if lock(&self.secret).take().is_some() {
            tracing::debug!("session secret invalidated");
        }
    }
}

impl<S: RecordStore + 'static> Drop for PassphraseSession<S> {
    fn drop(&mut self) {
        self.invalidate();
    }
}
