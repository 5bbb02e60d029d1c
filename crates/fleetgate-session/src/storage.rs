//! Durable key-value backends for the session store.
//!
//! The [`Storage`] trait mirrors the browser's `localStorage`: string keys,
//! string values, synchronous access. The session store serializes every
//! call behind its own lock, so backends take `&mut self` and need no
//! interior mutability.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::SessionError;

/// A durable string key-value store.
pub trait Storage: Send + 'static {
    /// Reads the value stored under `key`.
    fn get_item(&mut self, key: &str) -> Result<Option<String>, SessionError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Process-local storage. Contents vanish with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-filled with the given entries.
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            items: items
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&mut self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), SessionError> {
        self.items.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Storage persisted as a single JSON object on disk.
///
/// The file is read once on [`open`](Self::open) and rewritten atomically
/// (temp file, fsync, rename) on every mutation, so a crash mid-write
/// leaves either the old or the new contents, never a torn file. On Unix
/// the file is created with mode `0600` since it holds a credential.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens (or lazily creates) the storage file at `path`.
    ///
    /// A missing file is an empty store; the file and its parent
    /// directories are created on the first write.
    ///
    /// # Errors
    /// - [`SessionError::Storage`] if the file exists but can't be read
    /// - [`SessionError::Corrupt`] if it isn't a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let items = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                BTreeMap::new()
            }
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), entries = items.len(), "session file opened");
        Ok(Self { path, items })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), SessionError> {
        let content = serde_json::to_vec_pretty(&self.items)?;
        atomic_write(&self.path, &content)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&mut self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        let previous = self.items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist() {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => self.items.insert(key.to_string(), old),
                None => self.items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), SessionError> {
        let Some(previous) = self.items.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist() {
            self.items.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "session path has no file name")
        })?;
    let tmp_path = dir.join(format!(
        ".{file_name}.tmp.{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let result = (|| -> io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_set_get_remove() {
        let mut storage = MemoryStorage::new();
        storage.set_item("token", "T").unwrap();
        assert_eq!(storage.get_item("token").unwrap().as_deref(), Some("T"));

        storage.remove_item("token").unwrap();
        assert_eq!(storage.get_item("token").unwrap(), None);
    }

    #[test]
    fn test_memory_remove_missing_is_ok() {
        let mut storage = MemoryStorage::new();
        assert!(storage.remove_item("nope").is_ok());
    }

    #[test]
    fn test_file_open_missing_is_empty_and_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut storage = FileStorage::open(&path).unwrap();

        assert_eq!(storage.get_item("token").unwrap(), None);
        assert!(!path.exists(), "reading must not create the file");
    }

    #[test]
    fn test_file_survives_reopen() {
        // Simulates a process restart: a fresh FileStorage on the same
        // path sees what the previous one wrote.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let mut storage = FileStorage::open(&path).unwrap();
            storage.set_item("token", "T").unwrap();
        }

        let mut reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("token").unwrap().as_deref(), Some("T"));
    }

    #[test]
    fn test_file_remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut storage = FileStorage::open(&path).unwrap();
        storage.set_item("token", "T").unwrap();
        storage.set_item("user", "{}").unwrap();

        storage.remove_item("token").unwrap();

        let mut reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("token").unwrap(), None);
        assert_eq!(reopened.get_item("user").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_corrupt_contents_return_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"not json").unwrap();

        let result = FileStorage::open(&path);

        assert!(matches!(result, Err(SessionError::Corrupt(_))));
    }

    #[test]
    fn test_file_blank_contents_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"\n").unwrap();

        let mut storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("token").unwrap(), None);
    }

    #[test]
    fn test_file_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut storage = FileStorage::open(&path).unwrap();
        storage.set_item("token", "T").unwrap();
        storage.set_item("token", "U").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut storage = FileStorage::open(&path).unwrap();
        storage.set_item("token", "T").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
