use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants;

/// Where uploaded files are spooled while a body is decoded.
///
/// Implementations must hand out a fresh, writable file per call. The default
/// is [`SystemTempStorage`]; tests and embedders can substitute their own
/// directory layout.
pub trait TempStorage {
    /// Creates a new, empty file and returns its path with a handle opened for
    /// writing.
    fn create(&self) -> io::Result<(PathBuf, File)>;

    /// Deletes a file previously returned by [`create`](TempStorage::create).
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

impl<T: TempStorage + ?Sized> TempStorage for Arc<T> {
    fn create(&self) -> io::Result<(PathBuf, File)> {
        (**self).create()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }
}

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocates `uploaded-file-*.tmp` files in a directory, the system temp
/// directory by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTempStorage {
    dir: PathBuf,
}

impl SystemTempStorage {
    pub fn new() -> SystemTempStorage {
        SystemTempStorage::default()
    }

    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> SystemTempStorage {
        SystemTempStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for SystemTempStorage {
    fn default() -> Self {
        SystemTempStorage {
            dir: std::env::temp_dir(),
        }
    }
}

impl TempStorage for SystemTempStorage {
    fn create(&self) -> io::Result<(PathBuf, File)> {
        let ts_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        for _ in 0..32 {
            let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
            let candidate = self.dir.join(format!(
                "{}{}-{}-{}.tmp",
                constants::TEMP_FILE_PREFIX,
                std::process::id(),
                ts_nanos,
                counter
            ));

            match OpenOptions::new().create_new(true).write(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "failed to allocate a unique temp file",
        ))
    }
}

/// An open temp file that is closed and deleted when dropped, unless
/// [`keep`](TempFileGuard::keep) is called first.
pub struct TempFileGuard<'a> {
    storage: &'a dyn TempStorage,
    path: PathBuf,
    file: Option<File>,
    keep: bool,
}

impl<'a> TempFileGuard<'a> {
    pub fn create(storage: &'a dyn TempStorage) -> io::Result<TempFileGuard<'a>> {
        let (path, file) = storage.create()?;

        Ok(TempFileGuard {
            storage,
            path,
            file: Some(file),
            keep: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(bytes),
            None => Err(io::Error::new(io::ErrorKind::Other, "temp file already closed")),
        }
    }

    /// Flushes and closes the file, and releases it from deletion.
    pub fn keep(mut self) -> io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        self.keep = true;
        Ok(self.path.clone())
    }
}

impl Drop for TempFileGuard<'_> {
    fn drop(&mut self) {
        drop(self.file.take());

        if self.keep {
            return;
        }

        match self.storage.remove(&self.path) {
            Ok(()) => trace!("removed temp file {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove temp file {}: {}", self.path.display(), err),
        }
    }
}
