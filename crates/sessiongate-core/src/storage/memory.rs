use std::collections::HashMap;
use std::sync::Mutex;

use super::{Result, Scope, SessionStorage, StorageError};

/// In-memory storage with one map per scope.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    durable: Mutex<HashMap<String, String>>,
    tab: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, scope: Scope) -> &Mutex<HashMap<String, String>> {
        match scope {
            Scope::Durable => &self.durable,
            Scope::Tab => &self.tab,
        }
    }

    /// Drop everything in the tab scope, as closing a browsing context would.
    pub fn close_tab(&self) -> Result<()> {
        self.tab.lock().map_err(|_| StorageError::Poisoned)?.clear();
        Ok(())
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        let map = self.map(scope).lock().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()> {
        let mut map = self.map(scope).lock().map_err(|_| StorageError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<()> {
        let mut map = self.map(scope).lock().map_err(|_| StorageError::Poisoned)?;
        map.remove(key);
        Ok(())
    }
}
