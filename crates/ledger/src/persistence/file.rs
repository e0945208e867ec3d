use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::storage::{KeyValueStorage, StorageError};

/// Filesystem key/value storage: one file per key under a root directory.
///
/// File names are the hex-encoded key, so any key is a safe, distinct name.
/// Writes go to a uniquely named temporary file in the same directory and are
/// renamed into place, so a reader never sees a half-written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", hex::encode(key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;

        tmp.persist(self.path_for(key))
            .map(drop)
            .map_err(|err| io_err(err.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::open(dir.path()).unwrap().set("ledgerState:alice", "{}").unwrap();

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get("ledgerState:alice").unwrap().as_deref(), Some("{}"));
        assert_eq!(reopened.get("ledgerState:bob").unwrap(), None);
    }

    #[test]
    fn keys_map_to_distinct_safe_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set("a/b", "1").unwrap();
        storage.set("a:b", "2").unwrap();

        assert_eq!(storage.get("a/b").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get("a:b").unwrap().as_deref(), Some("2"));
        let files = fs::read_dir(storage.root()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn file_names_are_the_hex_encoded_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set("ledgerState:anon", "{}").unwrap();

        let expected = format!("{}.json", hex::encode("ledgerState:anon"));
        assert!(dir.path().join(expected).is_file());
    }

    #[test]
    fn overwrites_leave_no_temporary_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set("ledgerState:alice", "1").unwrap();
        storage.set("ledgerState:alice", "2").unwrap();

        assert_eq!(storage.get("ledgerState:alice").unwrap().as_deref(), Some("2"));
        assert_eq!(fs::read_dir(storage.root()).unwrap().count(), 1);
    }

    #[test]
    fn concurrent_writers_to_one_key_never_clobber_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let storage = std::sync::Arc::new(FileStorage::open(dir.path()).unwrap());

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        storage.set("ledgerState:alice", &i.to_string()).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let value: u32 = storage.get("ledgerState:alice").unwrap().unwrap().parse().unwrap();
        assert!(value < 8);
        assert_eq!(fs::read_dir(storage.root()).unwrap().count(), 1);
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x").join("y");
        let storage = FileStorage::open(&nested).unwrap();
        assert!(storage.root().is_dir());
    }
}
