//! Single-slot background execution.
//!
//! A [`TaskSlot`] runs at most one blocking job at a time on the tokio
//! blocking pool. Submitting while a job is in flight fails with
//! [`VaultError::Busy`]; the slot is released when the job finishes,
//! including when it panics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::{Result, VaultError};

#[derive(Clone)]
pub struct TaskSlot {
    busy: Arc<AtomicBool>,
    handle: Handle,
}

/// Marks the slot idle again when dropped.
struct Release(Arc<AtomicBool>);

impl Drop for Release {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TaskSlot {
    pub fn new(handle: Handle) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            handle,
        }
    }

    /// Slot bound to the runtime of the calling task.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| VaultError::Worker(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(handle))
    }

    pub fn is_idle(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    pub fn submit<T, F>(&self, work: F) -> Result<Completion<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VaultError::Busy);
        }

        let release = Release(Arc::clone(&self.busy));
        let (tx, rx) = oneshot::channel();

        self.handle.spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(work))
                .unwrap_or_else(|_| Err(VaultError::Worker("background job panicked".into())));
            // the slot frees up before the caller can observe the result
            drop(release);
            let _ = tx.send(result);
        });

        Ok(Completion { rx })
    }
}

/// Result of a submitted job.
#[must_use = "a completion does nothing unless awaited"]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    pub async fn wait(self) -> Result<T> {
        self.rx
            .await
            .map_err(|_| VaultError::Worker("background job terminated without a result".into()))?
    }
}
