//! Key/value backends behind the credential store.

use scrypt::Params as ScryptParams;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::crypto::{self, EncryptedStoreFile, MachineKey};
use crate::error::StoreError;

/// One key write in a batch: `Some(value)` sets, `None` removes.
pub type BatchEntry<'a> = (&'a str, Option<&'a str>);

/// Durable key/value namespace holding the session fields.
///
/// `write_batch` must apply all entries as a unit from the point of view of
/// other callers of the same backend.
pub trait KeyValueBackend: Send + Sync {
    /// Snapshot of every stored entry. Never fails; unreadable storage
    /// reads as empty.
    fn load(&self) -> BTreeMap<String, String>;

    fn write_batch(&self, batch: &[BatchEntry<'_>]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply_batch(entries: &mut BTreeMap<String, String>, batch: &[BatchEntry<'_>]) {
    for (key, value) in batch {
        match value {
            Some(value) => {
                entries.insert((*key).to_string(), (*value).to_string());
            }
            None => {
                entries.remove(*key);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// Process-local backend. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueBackend for MemoryBackend {
    fn load(&self) -> BTreeMap<String, String> {
        lock(&self.entries).clone()
    }

    fn write_batch(&self, batch: &[BatchEntry<'_>]) -> Result<(), StoreError> {
        apply_batch(&mut lock(&self.entries), batch);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileBackend
// ---------------------------------------------------------------------------

/// Encrypted JSON file backend that survives process restarts.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    kdf: ScryptParams,
    /// Serializes read-modify-write cycles and caches the derived key.
    key: Mutex<Option<MachineKey>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_kdf(path, ScryptParams::recommended())
    }

    pub(crate) fn with_kdf(path: impl Into<PathBuf>, kdf: ScryptParams) -> Self {
        Self {
            path: path.into(),
            kdf,
            key: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(
        &self,
        cached: &mut Option<MachineKey>,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(StoreError::Io(err)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let file: EncryptedStoreFile = serde_json::from_str(&text).map_err(|err| {
            StoreError::Invalid(format!(
                "failed to parse credential store `{}`: {err}",
                self.path.display()
            ))
        })?;
        let salt = crypto::file_salt(&file)?;
        let kek = match cached.take() {
            Some(kek) if kek.salt == salt => kek,
            _ => MachineKey::derive(salt, &self.kdf)?,
        };
        let opened = crypto::open_entries(&kek, &file);
        *cached = Some(kek);
        opened
    }

    fn write_entries(
        &self,
        cached: &mut Option<MachineKey>,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StoreError::Io(err)),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
            }
        }

        let kek = match cached.take() {
            Some(kek) => kek,
            None => MachineKey::generate(&self.kdf)?,
        };
        let sealed = crypto::seal_entries(&kek, entries);
        *cached = Some(kek);
        let text = serde_json::to_string_pretty(&sealed?).map_err(|err| {
            StoreError::Invalid(format!("failed to serialize credential store: {err}"))
        })?;

        let mut options = std::fs::OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        // `mode` only applies on create; tighten files that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn load(&self) -> BTreeMap<String, String> {
        let mut cached = lock(&self.key);
        match self.read_entries(&mut cached) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "credential store unreadable; treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn write_batch(&self, batch: &[BatchEntry<'_>]) -> Result<(), StoreError> {
        let mut cached = lock(&self.key);
        // A corrupt file is replaced rather than blocking new credentials.
        let mut entries = self.read_entries(&mut cached).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "discarding unreadable credential store");
            BTreeMap::new()
        });
        apply_batch(&mut entries, batch);
        self.write_entries(&mut cached, &entries)
    }
}
