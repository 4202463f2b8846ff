//! Transactional JSON file store
//!
//! The snapshot lives in one pretty-printed JSON document. A transaction
//! holds an exclusive advisory lock on a sibling lock file, keeps the
//! document's original bytes, stages the new document in a temp file in the
//! same directory and renames it over the original on commit.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use addin_core::ports::AddinStore;
use addin_core::record::StoreSnapshot;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{corrupt, lock_failed};
use crate::{Error, Result};

/// Where a [`FileStore`] keeps its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    pub dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_lock_file_name")]
    pub lock_file_name: String,
}

fn default_file_name() -> String {
    "addins.json".to_string()
}

fn default_lock_file_name() -> String {
    "addins.lock".to_string()
}

impl FileStoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: default_file_name(),
            lock_file_name: default_lock_file_name(),
        }
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(&self.lock_file_name)
    }

    fn staging_path(&self) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.tmp", self.file_name, std::process::id()))
    }
}

#[derive(Debug)]
struct Transaction {
    /// Held for the lifetime of the transaction; the lock goes with it.
    lock: File,
    /// Document bytes before the transaction, `None` if there was none.
    original: Option<Vec<u8>>,
    staged: Option<PathBuf>,
}

/// Store backed by one JSON document.
///
/// A transaction left open when the store is dropped is rolled back.
#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    transaction: Option<Transaction>,
}

impl FileStore {
    pub fn new(config: FileStoreConfig) -> Self {
        Self {
            config,
            transaction: None,
        }
    }

    /// A store using the default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStoreConfig::new(dir))
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn open_lock_file(&self) -> Result<File> {
        let path = self.config.lock_path();
        fs::create_dir_all(&self.config.dir).map_err(|e| Error::io(&self.config.dir, e))?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(&path, e))
    }

    fn restore(&self, original: Option<&[u8]>) -> Result<()> {
        let path = self.config.data_path();
        match original {
            Some(bytes) => {
                if read_bytes(&path)?.as_deref() != Some(bytes) {
                    tracing::warn!(path = %path.display(), "Restoring addin store document");
                    write_staged(&self.config.staging_path(), bytes)?;
                    fs::rename(self.config.staging_path(), &path).map_err(|e| Error::io(&path, e))?;
                }
            }
            None => match fs::remove_file(&path) {
                Ok(()) => tracing::warn!(path = %path.display(), "Removed addin store document"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&path, e)),
            },
        }
        Ok(())
    }

    fn discard_staged(staged: Option<&Path>) {
        if let Some(path) = staged {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file");
                }
            }
        }
    }
}

impl AddinStore for FileStore {
    fn load(&self) -> Result<StoreSnapshot> {
        let path = self.config.data_path();
        // Inside a transaction we already hold the exclusive lock.
        let _guard = match self.transaction {
            Some(_) => None,
            None if self.config.dir.exists() => {
                let lock = self.open_lock_file()?;
                lock.lock_shared().map_err(|_| lock_failed(&path))?;
                Some(lock)
            }
            None => None,
        };
        match read_bytes(&path)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| corrupt(&path, e)),
            None => Ok(StoreSnapshot::default()),
        }
    }

    fn start_transaction(&mut self) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Error::TransactionActive);
        }
        let lock = self.open_lock_file()?;
        lock.lock_exclusive()
            .map_err(|_| lock_failed(&self.config.lock_path()))?;
        let original = read_bytes(&self.config.data_path())?;
        tracing::debug!(
            path = %self.config.data_path().display(),
            existing = original.is_some(),
            "Started addin store transaction"
        );
        self.transaction = Some(Transaction {
            lock,
            original,
            staged: None,
        });
        Ok(())
    }

    fn write(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        let staging_path = self.config.staging_path();
        let transaction = self.transaction.as_mut().ok_or(Error::NoTransaction)?;
        let mut content =
            serde_json::to_vec_pretty(snapshot).map_err(|e| Error::Serialize(e.to_string()))?;
        content.push(b'\n');
        write_staged(&staging_path, &content)?;
        transaction.staged = Some(staging_path);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or(Error::NoTransaction)?;
        let Some(staged) = transaction.staged.as_deref() else {
            return Ok(());
        };
        let path = self.config.data_path();
        if let Err(e) = fs::rename(staged, &path) {
            Self::discard_staged(Some(staged));
            if let Err(restore) = self.restore(transaction.original.as_deref()) {
                tracing::warn!(error = %restore, "Failed to restore addin store after failed commit");
            }
            return Err(Error::CommitFailed {
                reason: format!("cannot replace {}: {e}", path.display()),
            });
        }
        tracing::debug!(path = %path.display(), "Committed addin store transaction");
        transaction
            .lock
            .unlock()
            .map_err(|_| lock_failed(&self.config.lock_path()))?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or(Error::NoTransaction)?;
        Self::discard_staged(transaction.staged.as_deref());
        self.restore(transaction.original.as_deref())?;
        tracing::debug!(path = %self.config.data_path().display(), "Rolled back addin store transaction");
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                path = %self.config.data_path().display(),
                "Addin store dropped with an open transaction, rolling back"
            );
            if let Err(e) = self.rollback() {
                tracing::warn!(error = %e, "Rollback on drop failed");
            }
        }
    }
}

/// Bytes of `path`, or `None` if it does not exist.
fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| Error::io(path, e))?;
    Ok(Some(bytes))
}

/// Write `content` to `path` and flush it to disk.
fn write_staged(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(content).map_err(|e| Error::io(path, e))?;
    file.sync_all().map_err(|e| Error::io(path, e))?;
    Ok(())
}
