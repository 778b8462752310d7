//! Locking writer for the database file
//!
//! A `LockedFile` holds an exclusive, non-blocking advisory lock on the open
//! database handle for as long as it lives. The lock is released in `Drop`,
//! so every exit path (success, error, panic during a mutation) unlocks
//! before the handle closes.
//!
//! Contention is never waited on: if another process holds the lock the
//! acquisition fails immediately with `CatalogError::Locked`.
//!
//! The lock is always attempted on the database handle itself. Only when
//! that attempt fails for a reason other than contention, or when the store
//! was configured with `LockSupport::Unavailable`, is the file written
//! without a lock, and a warning is logged that concurrency safety is not
//! guaranteed.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;

use fs2::FileExt;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use super::document::Database;
use crate::errors::{CatalogError, CatalogResult};

/// Locking policy for a store: lock the database handle, or write unlocked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LockSupport {
    #[default]
    Available,
    Unavailable { reason: String },
}

impl LockSupport {
    pub fn is_available(&self) -> bool {
        matches!(self, LockSupport::Available)
    }

    /// Tries locking a scratch file in `dir`
    pub fn detect(dir: &Path) -> Self {
        let scratch_path = dir.join(format!(".devicedb-lock-check-{}", process::id()));
        let file = match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&scratch_path)
        {
            Ok(f) => f,
            Err(e) => {
                return LockSupport::Unavailable {
                    reason: format!("cannot create scratch file: {}", e),
                }
            }
        };

        let support = match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                LockSupport::Available
            }
            Err(e) => LockSupport::Unavailable {
                reason: e.to_string(),
            },
        };

        drop(file);
        let _ = fs::remove_file(&scratch_path);
        support
    }
}

static LOCK_SUPPORT: OnceCell<LockSupport> = OnceCell::new();

/// Lock support of the temp directory's filesystem, detected once.
///
/// Reported at startup for diagnostics only; it never decides whether a
/// database write is locked.
pub fn lock_support() -> &'static LockSupport {
    LOCK_SUPPORT.get_or_init(|| {
        let support = LockSupport::detect(&env::temp_dir());
        if let LockSupport::Unavailable { reason } = &support {
            warn!(
                target: "devicedb::store",
                reason = %reason,
                "Advisory file locking unavailable in the temp directory"
            );
        }
        support
    })
}

fn is_contention(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Exclusive handle on the database file
pub struct LockedFile {
    path: PathBuf,
    file: File,
    locked: bool,
}

impl LockedFile {
    /// Opens `path` (creating it if missing, never truncating) and takes the
    /// exclusive lock without blocking.
    ///
    /// # Errors
    ///
    /// `CatalogError::Locked` if another holder has the lock,
    /// `CatalogError::Io` if the file cannot be opened.
    pub fn acquire(path: &Path) -> CatalogResult<Self> {
        Self::acquire_with(path, &LockSupport::Available)
    }

    /// Like `acquire`, but `LockSupport::Unavailable` skips the lock and
    /// opens the file for an unprotected write.
    pub fn acquire_with(path: &Path, support: &LockSupport) -> CatalogResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                CatalogError::io(format!("Failed to open database {}", path.display()), e)
            })?;

        let locked = match support {
            LockSupport::Available => match FileExt::try_lock_exclusive(&file) {
                Ok(()) => true,
                Err(e) if is_contention(&e) => {
                    return Err(CatalogError::Locked(format!(
                        "Database {} is being used by another process",
                        path.display()
                    )));
                }
                Err(e) => {
                    warn!(
                        target: "devicedb::store",
                        path = %path.display(),
                        error = %e,
                        "Unable to lock database file; concurrency safety is not guaranteed"
                    );
                    false
                }
            },
            LockSupport::Unavailable { reason } => {
                warn!(
                    target: "devicedb::store",
                    path = %path.display(),
                    reason = %reason,
                    "Writing without a lock; concurrency safety is not guaranteed"
                );
                false
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            locked,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the advisory lock is actually held
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Reads the whole file through the locked handle
    pub fn read_database(&mut self) -> CatalogResult<Database> {
        let mut raw = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut raw))
            .map_err(|e| {
                CatalogError::io(format!("Failed to read database {}", self.path.display()), e)
            })?;
        Database::from_json(&raw)
    }

    /// Replaces the entire file content with `db`
    pub fn write_database(&mut self, db: &Database) -> CatalogResult<()> {
        let bytes = db.to_json()?;
        let path = &self.path;
        let file = &mut self.file;

        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(&bytes))
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                CatalogError::io(format!("Failed to write database {}", path.display()), e)
            })?;

        debug!(
            target: "devicedb::store",
            path = %path.display(),
            documents = db.len(),
            "Database stored"
        );
        Ok(())
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if self.locked {
            if let Err(e) = FileExt::unlock(&self.file) {
                warn!(
                    target: "devicedb::store",
                    path = %self.path.display(),
                    error = %e,
                    "Failed to release database lock"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    struct BufferWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for SharedBuffer {
        type Writer = BufferWriter;

        fn make_writer(&'a self) -> Self::Writer {
            BufferWriter(Arc::clone(&self.0))
        }
    }

    impl io::Write for BufferWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lock_support_in_temp_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(LockSupport::detect(tmp.path()).is_available());
        // Scratch file is cleaned up
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_second_acquire_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");

        let first = LockedFile::acquire(&path).unwrap();
        assert!(first.is_locked());

        match LockedFile::acquire(&path) {
            Err(CatalogError::Locked(_)) => {}
            other => panic!("expected lock contention, got {:?}", other.map(|_| ())),
        }

        drop(first);
        assert!(LockedFile::acquire(&path).is_ok());
    }

    #[test]
    fn test_acquire_does_not_truncate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        fs::write(&path, "{}").unwrap();

        let mut locked = LockedFile::acquire(&path).unwrap();
        assert!(locked.read_database().unwrap().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_unsupported_temp_dir_does_not_disable_locking() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        assert!(!LockSupport::detect(&missing).is_available());

        let path = tmp.path().join("db.json");
        fs::write(&path, "{\"dev1\": {\"_id\": \"dev1\"}}").unwrap();
        let holder = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        FileExt::try_lock_exclusive(&holder).unwrap();

        assert!(matches!(
            LockedFile::acquire(&path),
            Err(CatalogError::Locked(_))
        ));
        assert!(fs::read_to_string(&path).unwrap().contains("dev1"));
    }

    #[test]
    fn test_unavailable_support_writes_unlocked_and_warns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        let support = LockSupport::Unavailable {
            reason: "no flock on this mount".into(),
        };

        let sink = SharedBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut file = LockedFile::acquire_with(&path, &support).unwrap();
            assert!(!file.is_locked());
            file.write_database(&Database::new()).unwrap();
        });

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        let logs = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Writing without a lock"));
        assert!(logs.contains("no flock on this mount"));
    }
}
