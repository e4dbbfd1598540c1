use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use super::{Result, Scope, SessionStorage, StorageError};

/// Durable values are files in `data_dir`; tab values live in process memory.
///
/// A process plays the role of a browsing context: whatever was saved with
/// `Scope::Tab` is gone once it exits.
#[derive(Debug)]
pub struct FileStorage {
    data_dir: PathBuf,
    tab: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            tab: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(StorageError::Unavailable(format!("invalid storage key: {:?}", key)));
        }
        Ok(self.data_dir.join(format!("{}.json", key)))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        match scope {
            Scope::Durable => {
                let path = self.value_path(key)?;
                if !path.exists() {
                    return Ok(None);
                }
                Ok(Some(std::fs::read_to_string(&path)?))
            }
            Scope::Tab => {
                let tab = self.tab.lock().map_err(|_| StorageError::Poisoned)?;
                Ok(tab.get(key).cloned())
            }
        }
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()> {
        match scope {
            Scope::Durable => {
                let path = self.value_path(key)?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, value)?;
                debug!(path = %path.display(), "Wrote durable value");
                Ok(())
            }
            Scope::Tab => {
                let mut tab = self.tab.lock().map_err(|_| StorageError::Poisoned)?;
                tab.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<()> {
        match scope {
            Scope::Durable => {
                let path = self.value_path(key)?;
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
                Ok(())
            }
            Scope::Tab => {
                let mut tab = self.tab.lock().map_err(|_| StorageError::Poisoned)?;
                tab.remove(key);
                Ok(())
            }
        }
    }
}
