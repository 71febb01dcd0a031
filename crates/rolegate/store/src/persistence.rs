//! Persistence of the raw configuration record.
//!
//! The store deals in text so that malformed content can be detected and
//! logged by the store itself rather than hidden inside a backend.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};

/// Backend holding the serialized access configuration
pub trait ConfigPersistence: Send + Sync {
    /// Read the raw record. `Ok(None)` when nothing has been persisted yet.
    fn read(&self) -> StoreResult<Option<String>>;

    /// Replace the raw record.
    fn write(&self, contents: &str) -> StoreResult<()>;

    /// Human readable location, used in logs.
    fn describe(&self) -> String;
}

/// JSON file on disk.
///
/// Writes are atomic: the record is written to `<path>.tmp` and renamed
/// over the target.
pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPersistence for JsonFileConfig {
    fn read(&self) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory record (for testing and embedding).
#[derive(Default)]
pub struct InMemoryConfig {
    data: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl InMemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the record with raw contents
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(Some(contents.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent writes fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current raw contents
    pub fn contents(&self) -> Option<String> {
        self.data.lock().ok().and_then(|data| data.clone())
    }
}

impl ConfigPersistence for InMemoryConfig {
    fn read(&self) -> StoreResult<Option<String>> {
        let data = self.data.lock().map_err(|_| StoreError::LockError)?;
        Ok(data.clone())
    }

    fn write(&self, contents: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "writes disabled",
            )));
        }
        let mut data = self.data.lock().map_err(|_| StoreError::LockError)?;
        *data = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

impl<P: ConfigPersistence + ?Sized> ConfigPersistence for std::sync::Arc<P> {
    fn read(&self) -> StoreResult<Option<String>> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> StoreResult<()> {
        (**self).write(contents)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_file_missing_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileConfig::new(dir.path().join("access-config.json"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn json_file_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("access-config.json");
        let file = JsonFileConfig::new(&path);

        file.write("{\"roles\":[]}").unwrap();
        assert_eq!(file.read().unwrap().as_deref(), Some("{\"roles\":[]}"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn in_memory_write_failure() {
        let mem = InMemoryConfig::with_contents("{}");
        mem.set_fail_writes(true);
        assert!(matches!(mem.write("[]"), Err(StoreError::Io(_))));
        assert_eq!(mem.contents().as_deref(), Some("{}"));

        mem.set_fail_writes(false);
        mem.write("[]").unwrap();
        assert_eq!(mem.contents().as_deref(), Some("[]"));
    }
}
