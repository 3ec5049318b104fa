//! Crash-safe file persistence for the vault's record and preference files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::crypto::secure_random;
use crate::error::{Result, VaultError};

/// A single file written with atomic replace semantics.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns `true` if the storage file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the entire storage file into memory.
    pub fn load(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file contents with `data`.
    ///
    /// The bytes go to a synced sibling temp file which is then swapped in
    /// and the directory synced. A reader sees the old contents or the new
    /// contents, never a mix. A failed save removes its temp file.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.random_tmp_path()?;

        // fail if the temp name is somehow taken
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        if let Err(e) = tmp_file.write_all(data).and_then(|_| tmp_file.sync_all()) {
            drop(tmp_file);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        drop(tmp_file);

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Some(parent) = self.path.parent() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }

        tracing::trace!(path = %self.path.display(), bytes = data.len(), "file replaced");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file name>.tmp.<16 hex chars>` next to the target.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut suffix = [0u8; 8];
        secure_random(&mut suffix)?;
        let suffix: String = suffix.iter().map(|b| format!("{b:02x}")).collect();

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| {
                VaultError::Io {
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "storage path has no file name",
                    ),
                }
            })?
            .to_string_lossy();

        Ok(self.path.with_file_name(format!("{file_name}.tmp.{suffix}")))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// Uses Windows `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH`. The API
    /// requires an existing target, so a first save falls back to a rename.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            fs::rename(tmp_path, &self.path)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(())
    }

    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_returns_written_data() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("vault.mvlt"));
        storage.save(b"hello world").unwrap();

        assert_eq!(storage.load().unwrap(), b"hello world");
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("missing.mvlt"));

        assert!(matches!(storage.load(), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn exists_tracks_saves() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("vault.mvlt"));
        assert!(!storage.exists());

        storage.save(b"data").unwrap();
        assert!(storage.exists());
    }

    #[test]
    fn random_tmp_paths_are_siblings_and_unique() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.mvlt");
        let storage = Storage::new(path.clone());

        let a = storage.random_tmp_path().unwrap();
        let b = storage.random_tmp_path().unwrap();

        assert_eq!(a.parent(), path.parent());
        assert_ne!(a, path);
        assert_ne!(a, b);
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.mvlt");
        let storage = Storage::new(path.clone());

        storage.save(b"first").unwrap();
        storage.save(b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("vault.mvlt"));
        storage.save(b"data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "vault.mvlt");
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("vault.mvlt");

        Storage::new(nested.clone()).save(b"data").unwrap();

        assert!(nested.exists());
    }
}
