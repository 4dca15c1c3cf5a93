//! File-backed draft storage: one JSON file per draft key.
//!
//! Writes go to `{key}.json.tmp` and are renamed over `{key}.json`, so a crash
//! mid-write leaves the previous draft intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use intake_wizard::{DraftStorage, DraftStoreError};

#[derive(Debug, Clone)]
pub struct FileDraftStorage {
    dir: PathBuf,
}

impl FileDraftStorage {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create draft directory at {:?}", dir))?;
        Ok(Self { dir })
    }

    /// `{app_data_dir}/intake/drafts`.
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut h| {
                    h.push(".local");
                    h.push("share");
                    h
                })
            })
            .context("failed to resolve OS app data directory - tried data_local_dir() and home_dir()/.local/share")?;
        Ok(base.join("intake").join("drafts"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DraftStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DraftStoreError::Io(format!("invalid draft key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> DraftStoreError {
    DraftStoreError::Io(format!("failed to {action} {}: {err}", path.display()))
}

impl DraftStorage for FileDraftStorage {
    fn read(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", &path, err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| io_error("create", &self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| io_error("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error("replace", &path, e))?;
        debug!(path = %path.display(), bytes = value.len(), "draft file written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error("remove", &path, err)),
        }
    }
}
