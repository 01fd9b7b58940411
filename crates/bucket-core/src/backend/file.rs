use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::KeyValueBackend;
use crate::error::{Result, StoreError};

/// Directory-backed storage: one file per key.
///
/// Writes land in a sibling `<name>~` file that is renamed over the target, so
/// a reader only ever sees a complete blob. Key names never contain `~`, so
/// the temporary file cannot clash with another key's data.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (or create) a storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Persistence(format!("create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }
}

/// Map a storage key to a safe file name.
fn file_name_for(key: &str) -> String {
    let name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        format!("_{}", name)
    } else {
        name
    }
}

fn temp_name_for(key: &str) -> String {
    format!("{}~", file_name_for(key))
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Persistence(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(temp_name_for(key));

        let write = || -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(value)?;
            f.sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::Persistence(format!("write {}: {}", path.display(), e))
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Persistence(format!(
                "remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_name_for("bucket_list_items"), "bucket_list_items");
        assert_eq!(file_name_for("@bucket_list_items"), "_bucket_list_items");
        assert_eq!(file_name_for("../escape"), ".._escape");
        assert_eq!(file_name_for(".."), "_..");
        assert_eq!(file_name_for(""), "_");
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        assert!(backend.get("bucket_list_items").unwrap().is_none());
        backend.set("bucket_list_items", b"[]").unwrap();
        assert_eq!(
            backend.get("bucket_list_items").unwrap().as_deref(),
            Some(&b"[]"[..])
        );
        assert!(!dir.path().join(temp_name_for("bucket_list_items")).exists());
    }

    #[test]
    fn temp_file_never_shadows_another_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        backend.set("a.tmp", b"other").unwrap();
        backend.set("a~", b"tilde").unwrap();
        backend.set("a", b"mine").unwrap();

        assert_eq!(backend.get("a.tmp").unwrap().as_deref(), Some(&b"other"[..]));
        assert_eq!(backend.get("a~").unwrap().as_deref(), Some(&b"tilde"[..]));
        assert_eq!(backend.get("a").unwrap().as_deref(), Some(&b"mine"[..]));
        assert_ne!(temp_name_for("a"), file_name_for("a~"));
    }

    #[test]
    fn open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let backend = FileBackend::open(&nested).unwrap();
        assert!(backend.dir().is_dir());
    }

    #[test]
    fn remove_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.remove("never_written").unwrap();
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileBackend::open(dir.path())
            .unwrap()
            .set("k", b"persisted")
            .unwrap();

        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some(&b"persisted"[..]));
    }
}
