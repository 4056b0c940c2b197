//! Session storage
//!
//! Key/value storage for the client session, the equivalent of browser
//! local storage. `MemoryStore` lives for the process, `FileStore` keeps the
//! values in a JSON file so the CLI can reuse a session across runs.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;
use tracing::warn;

use super::error::ClientError;

pub const TOKEN_KEY: &str = "jwt";
pub const USER_KEY: &str = "user";

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    fn remove(&self, key: &str) -> Result<(), ClientError>;

    /// Write several keys as one update. When a write fails, keys already
    /// written get their previous values back.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), ClientError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::new();

        for &(key, value) in entries {
            let previous = self.get(key);
            if let Err(e) = self.set(key, value) {
                for (key, previous) in written.into_iter().rev() {
                    let restored = match previous {
                        Some(old) => self.set(key, &old),
                        None => self.remove(key),
                    };
                    if let Err(restore) = restored {
                        return Err(ClientError::Storage(format!(
                            "{}; restoring {} failed: {}",
                            e, key, restore
                        )));
                    }
                }
                return Err(e);
            }
            written.push((key, previous));
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values
            .write()
            .map_err(|_| ClientError::Storage("store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.values
            .write()
            .map_err(|_| ClientError::Storage("store lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), ClientError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| ClientError::Storage("store lock poisoned".to_string()))?;
        for &(key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temporary file next to the target, then rename it over
    /// the target so readers never see a half-written file
    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), ClientError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(serde_json::to_string_pretty(values)?.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| ClientError::from(e.error))?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(values) => values.get(key).cloned(),
            Err(e) => {
                warn!("Failed to read session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        // Unreadable content counts as an empty session
        let (mut values, discarded) = match self.load() {
            Ok(values) => (values, false),
            Err(e) => {
                warn!(
                    "Discarding unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                (BTreeMap::new(), true)
            }
        };

        if values.remove(key).is_some() || discarded {
            self.save(&values)?;
        }
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), ClientError> {
        let mut values = self.load()?;
        for &(key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        self.save(&values)
    }
}
