//! File-backed store keeping one file per key
//!
//! Values are written to a sibling temp file and renamed into place, so a
//! reader never observes a half-written value for a single key.

use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{parse_i64, PersistentStore, StoreError};

/// Stores each key as a small text file in a cache directory
///
/// The default location is XDG-compliant (`~/.cache/bookingcache/` on Linux).
/// The directory is created lazily on the first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where value files are stored
    dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "bookingcache")?;
        Some(Self {
            dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file holding `key`
    ///
    /// Bytes outside `[A-Za-z0-9._-]` are written as `%XX`, so distinct keys
    /// map to distinct files and a key can never escape the store directory.
    fn value_path(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
                file_name.push(char::from(byte));
            } else {
                file_name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}.val", file_name))
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.value_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.value_path(key);
        let tmp = path.with_extension("val.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl PersistentStore for FileStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read_raw(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write_raw(key, value)
    }

    fn get_i64(&self, key: &str, default: i64) -> Result<i64, StoreError> {
        match self.read_raw(key)? {
            Some(raw) => parse_i64(key, &raw),
            None => Ok(default),
        }
    }

    fn put_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.write_raw(key, &value.to_string())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
