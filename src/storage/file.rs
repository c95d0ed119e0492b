use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Storage, StorageError};
use crate::db::{ensure_parent_dir, open_lock};
use crate::watch::{record_internal_write, ChangeCallback, ChangeWatcher};

/// One `<key>.json` file per key inside a data directory.
///
/// Readers and writers coordinate through an advisory lock on a sibling
/// `<key>.lock` file. Writes land in a temp file first and are renamed over
/// the target, so a reader never sees a half-written blob.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let invalid = key.is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\'])
            || key.contains("..");
        if invalid {
            return Err(StorageError::InvalidPath(self.dir.join(key)));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !self.dir.is_dir() {
            return Ok(None);
        }
        let lock = open_lock(&path)?;
        let _guard = lock.read()?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        ensure_parent_dir(&path)?;
        let mut lock = open_lock(&path)?;
        let _guard = lock.write()?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        record_internal_write(&path);

        tracing::debug!(
            target: "storage::file",
            path = %path.display(),
            bytes = value.len(),
            "Wrote storage file"
        );
        Ok(())
    }

    fn watch(
        &self,
        key: &str,
        on_change: ChangeCallback,
    ) -> Result<Option<ChangeWatcher>, StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        Ok(Some(ChangeWatcher::new(path, on_change)?))
    }
}
